/// Format seconds as `mm:ss`. Minutes are zero-padded to two digits only when
/// `leading_zero` is set; seconds always are.
pub fn format_clock(seconds: u64, leading_zero: bool) -> String {
    let m = seconds / 60;
    let s = seconds % 60;
    if leading_zero {
        format!("{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}
