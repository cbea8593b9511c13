fn main() {
    tabpilot_lib::run()
}
