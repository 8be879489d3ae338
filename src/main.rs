fn main() -> std::process::ExitCode {
    ultimaesperanca_installer_lib::run()
}
