use provoke_core::timestamp::format_clock;
use provoke_transcript::{build_transcript_text, fetch_transcript, ReqwestCaptionHttp};

/// Execute `provoke transcript <url>`
pub fn execute(url: &str, max_chars: Option<usize>) -> anyhow::Result<()> {
    let http = ReqwestCaptionHttp::new()?;
    let lines = tokio::runtime::Runtime::new()?.block_on(fetch_transcript(&http, url))?;
    if lines.is_empty() {
        eprintln!("No caption lines found.");
        return Ok(());
    }
    match max_chars {
        Some(max) => println!("{}", build_transcript_text(&lines, max)),
        None => {
            for line in &lines {
                println!("[{}] {}", format_clock(line.start_offset_ms), line.text);
            }
        }
    }
    Ok(())
}
