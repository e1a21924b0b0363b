use owo_colors::OwoColorize;

/// Consistent, colored user-facing messages. Colors only when stdout is a TTY.
fn is_tty() -> bool {
    atty::is(atty::Stream::Stdout)
}

pub fn print_info(msg: &str) {
    if is_tty() {
        println!("{} {}", "info:".cyan().bold(), msg);
    } else {
        println!("info: {}", msg);
    }
}

pub fn print_warn(msg: &str) {
    if is_tty() {
        eprintln!("{} {}", "warn:".yellow().bold(), msg);
    } else {
        eprintln!("warn: {}", msg);
    }
}

pub fn print_error(msg: &str) {
    if is_tty() {
        eprintln!("{} {}", "error:".red().bold(), msg);
    } else {
        eprintln!("error: {}", msg);
    }
}

/// Bucket heading such as "Files to Copy:".
pub fn print_heading(msg: &str) {
    if is_tty() {
        println!("{}", msg.bold());
    } else {
        println!("{}", msg);
    }
}

/// Plain line, no prefix. Copy banners and progress lines go through here.
pub fn print_user(msg: &str) {
    println!("{}", msg);
}

pub fn print_blank() {
    println!();
}
