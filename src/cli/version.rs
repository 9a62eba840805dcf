/// Display version information
pub fn execute() {
    println!("gatehouse {}", env!("CARGO_PKG_VERSION"));
    println!("Access gate and site-status service");
}
