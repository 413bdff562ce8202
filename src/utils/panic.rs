/// Colored backtraces on panic
pub fn setup() {
    color_backtrace::install();
}
