mod session;

use std::env;
use std::io::{self, Write};
use std::process;

use session::{Session, TranscriptProfile};

fn main() -> io::Result<()> {
    let profile = parse_profile().unwrap_or_else(|err| {
        eprintln!("{err}");
        eprintln!(
            "Usage: remote-emulator [--profile <cycle|skip|glitch>] | remote-emulator <cycle|skip|glitch>"
        );
        process::exit(2);
    });

    let stdout = io::stdout();
    let mut writer = stdout.lock();
    let mut session = Session::new(profile)?;

    writeln!(writer, "{}", profile.header())?;

    let summary = session.run()?;
    for line in &summary.lines {
        writeln!(writer, "{line}")?;
    }

    writeln!(
        writer,
        "Session closed: {} boot(s), {} IR frame(s), {} deep sleep(s). Transcript in {}.",
        summary.boots,
        summary.frames,
        summary.sleeps,
        session.profile().log_path()
    )?;

    Ok(())
}

fn parse_profile() -> Result<TranscriptProfile, String> {
    let mut args = env::args().skip(1);
    if let Some(arg) = args.next() {
        if let Some(value) = arg.strip_prefix("--profile=") {
            TranscriptProfile::from_tag(value)
        } else if arg == "--profile" {
            if let Some(value) = args.next() {
                TranscriptProfile::from_tag(&value)
            } else {
                Err("Expected value after --profile".to_string())
            }
        } else {
            TranscriptProfile::from_tag(&arg)
        }
    } else {
        Ok(TranscriptProfile::Cycle)
    }
}
