fn main() {
    if let Err(err) = quake_ingest::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
