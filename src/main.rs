fn main() {
    if let Err(err) = mindsvg::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
