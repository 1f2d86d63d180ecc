//! The boot banner.

const LOGO: &str = r"
    _             _     _            _
   / \   _ __ ___| |__ (_)_ __   ___| | __ _  __ _  ___
  / _ \ | '__/ __| '_ \| | '_ \ / _ \ |/ _` |/ _` |/ _ \
 / ___ \| | | (__| | | | | |_) |  __/ | (_| | (_| | (_) |
/_/   \_\_|  \___|_| |_|_| .__/ \___|_|\__,_|\__, |\___/
                         |_|                 |___/
";

const COLOR_BRIGHT_WHITE: &str = "\x1b[97m";
const COLOR_RESET: &str = "\x1b[0m";

/// Prints the logo to standard output.
pub fn print_logo(no_color: bool) {
    if no_color {
        println!("{LOGO}");
    } else {
        println!("{COLOR_RESET}{COLOR_BRIGHT_WHITE}{LOGO}{COLOR_RESET}");
    }
}
