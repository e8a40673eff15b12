fn main() -> std::process::ExitCode {
    fillsense_lib::run()
}
