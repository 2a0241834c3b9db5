fn main() {
    std::process::exit(scanhub::app::startup::startup());
}
