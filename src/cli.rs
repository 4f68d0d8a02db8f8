use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "dirwin",
    version,
    about = "Multi-window directory browser with live refresh and chorded key commands"
)]
pub struct Cli {
    /// Show hidden (dot) files in the first window.
    #[arg(short = 'd', long = "dotfiles")]
    pub dotfiles: bool,

    /// Starting directory.
    #[arg(value_name = "PATH", default_value = ".")]
    pub path: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_current_directory() {
        let cli = Cli::parse_from(["dirwin"]);
        assert_eq!(cli.path, ".");
        assert!(!cli.dotfiles);
    }

    #[test]
    fn accepts_dotfiles_flag_and_path() {
        let cli = Cli::parse_from(["dirwin", "-d", "/tmp"]);
        assert_eq!(cli.path, "/tmp");
        assert!(cli.dotfiles);
    }
}
