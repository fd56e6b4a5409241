fn main() {
    til_ssa::projects::cli::start_cli();
}
