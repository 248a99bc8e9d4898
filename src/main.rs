use anyhow::Result;
use console::{Term, style};
use koma::config::Config;
use koma::init;
use koma::menu::show_main_menu;
use koma::signal::setup_shutdown_signal;
use koma::tools::ResourceLocator;
use log::{info, warn};

fn main() -> Result<()> {
    init::init();
    let term = Term::stdout();
    let shutdown_signal = setup_shutdown_signal();

    let mut config = Config::new(ResourceLocator::from_current_exe())?;

    loop {
        match show_main_menu(&term, &shutdown_signal, &mut config) {
            Ok(true) => {}
            Ok(false) => {
                term.clear_screen()?;
                println!("\n{}", style("再見！").green().bold());
                info!("程式正常結束");
                break;
            }
            Err(e) => {
                warn!("程式錯誤: {e}");
                eprintln!("{} {e}", style("錯誤:").red().bold());
                break;
            }
        }
    }

    Ok(())
}
