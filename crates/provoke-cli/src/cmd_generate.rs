use crate::render::print_deck;
use anyhow::bail;
use provoke_conductor::{DeepOutcome, GenerationInputs, GenerationReport, Overlay, StderrStatus};
use provoke_context::ContextStore;
use provoke_core::{InputMode, Settings, VideoRef};
use provoke_model::GeminiClient;
use provoke_store::{load_settings, FileStore, KvStore};
use provoke_transcript::{fetch_transcript, video_id_from_url, ReqwestCaptionHttp};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct GenerateArgs {
    pub video_id: String,
    pub caption_url: String,
    pub goal: String,
    pub quick_only: bool,
    pub json: bool,
}

/// Execute `provoke generate --video-id ID --caption-url URL`
pub fn execute(args: &GenerateArgs) -> anyhow::Result<()> {
    let store: Arc<dyn KvStore> = Arc::new(FileStore::open_default());
    let settings = Settings {
        input_mode: InputMode::Transcript,
        ..load_settings(store.as_ref(), None)
    };
    let client = Arc::new(GeminiClient::new(settings.api_key.clone())?);
    let context = Arc::new(ContextStore::new(store).with_max_records(settings.max_stored_videos));
    let overlay = Overlay::new(client, context, settings).with_status(Arc::new(StderrStatus));

    let cancel = CancellationToken::new();
    ctrlc_cancel(cancel.clone());

    let rt = tokio::runtime::Runtime::new()?;
    let report = rt.block_on(run(&overlay, args, cancel))?;

    let Some(report) = report else {
        bail!("a generation is already running");
    };
    let deck = match &report.deep {
        DeepOutcome::Committed(deep) => &deep.deck,
        DeepOutcome::Failed(reason) => {
            eprintln!("Deep pass failed ({reason}); showing quick deck.");
            &report.quick.deck
        }
        DeepOutcome::Skipped | DeepOutcome::Superseded => &report.quick.deck,
    };
    print_deck(deck, args.json)
}

async fn run(
    overlay: &Overlay,
    args: &GenerateArgs,
    cancel: CancellationToken,
) -> anyhow::Result<Option<GenerationReport>> {
    let session = overlay.navigate(VideoRef::new(resolve_video_id(&args.video_id)))?;
    let http = ReqwestCaptionHttp::new()?;
    let lines = fetch_transcript(&http, &args.caption_url).await?;
    eprintln!("Transcript loaded ({} lines).", lines.len());
    session.set_transcript(lines);

    let inputs = GenerationInputs {
        goal: args.goal.clone(),
        quick_only: args.quick_only,
        ..GenerationInputs::default()
    };
    tokio::select! {
        _ = cancel.cancelled() => {
            overlay.teardown();
            bail!("interrupted")
        }
        report = overlay.generate(&session, inputs) => Ok(report?),
    }
}

/// Accept either a bare video id or a watch URL.
fn resolve_video_id(arg: &str) -> String {
    video_id_from_url(arg).unwrap_or_else(|| arg.trim().to_string())
}

fn ctrlc_cancel(cancel: CancellationToken) {
    let _ = ctrlc::set_handler(move || {
        cancel.cancel();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_id_from_id_or_watch_url() {
        assert_eq!(resolve_video_id("dQw4w9WgXcQ"), "dQw4w9WgXcQ");
        assert_eq!(resolve_video_id(" dQw4w9WgXcQ "), "dQw4w9WgXcQ");
        assert_eq!(
            resolve_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=3s"),
            "dQw4w9WgXcQ"
        );
    }
}
