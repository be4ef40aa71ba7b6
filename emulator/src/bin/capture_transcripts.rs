use std::io;

#[allow(dead_code)]
#[path = "../session.rs"]
mod session;

use session::{Session, TranscriptProfile};

fn main() -> io::Result<()> {
    record_profile(TranscriptProfile::Cycle)?;
    record_profile(TranscriptProfile::Skip)?;
    record_profile(TranscriptProfile::Glitch)?;
    Ok(())
}

fn record_profile(profile: TranscriptProfile) -> io::Result<()> {
    let mut session = Session::new(profile)?;
    let summary = session.run()?;
    println!(
        "{}: {} line(s) written to {}",
        profile.header(),
        summary.lines.len(),
        profile.log_path()
    );
    Ok(())
}
