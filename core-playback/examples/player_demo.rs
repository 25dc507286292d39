//! # Player Engine Example
//!
//! Drives the playback engine against a console media element: loads a book
//! with chapters, plays, skips around and prints the player clock.
//!
//! Run with: `cargo run --example player_demo --package core-playback`

use bridge_traits::error::Result as BridgeResult;
use bridge_traits::media::{AudioSource, MediaElement};
use core_library::models::{Chapter, Format, Metadata, Tags};
use core_playback::{EngineConfig, PlaybackEngine, PlaybackEvent, TimeDisplay};
use parking_lot::Mutex;
use std::sync::Arc;

// ============================================================================
// Console media element
// ============================================================================

/// Media element that only keeps a clock and prints what it is asked to do.
#[derive(Default)]
struct ConsoleMedia {
    time: Mutex<f64>,
    playing: Mutex<bool>,
}

impl ConsoleMedia {
    fn advance(&self, seconds: f64) {
        if *self.playing.lock() {
            *self.time.lock() += seconds;
        }
    }
}

impl MediaElement for ConsoleMedia {
    fn load(&self, source: &AudioSource) {
        println!("  [media] load remote={}", source.is_remote());
        *self.time.lock() = 0.0;
    }

    fn play(&self) -> BridgeResult<()> {
        *self.playing.lock() = true;
        Ok(())
    }

    fn pause(&self) {
        *self.playing.lock() = false;
    }

    fn seek(&self, seconds: f64) {
        println!("  [media] seek {:.1}", seconds);
        *self.time.lock() = seconds;
    }

    fn current_time(&self) -> f64 {
        *self.time.lock()
    }

    fn duration(&self) -> Option<f64> {
        Some(3600.0)
    }

    fn is_paused(&self) -> bool {
        !*self.playing.lock()
    }

    fn detach(&self) {
        *self.playing.lock() = false;
    }
}

fn chapter(id: i64, title: &str, start: f64, end: f64) -> Chapter {
    Chapter {
        id,
        start_time: format!("{start:.6}"),
        end_time: format!("{end:.6}"),
        tags: Tags {
            title: Some(title.to_string()),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn print_clock(engine: &PlaybackEngine) {
    let chapter = engine
        .current_chapter()
        .and_then(|c| c.title)
        .unwrap_or_else(|| "-".to_string());
    println!(
        "  {} / {}  chapter: {}",
        TimeDisplay::Elapsed.render(engine.current_time(), engine.duration()),
        TimeDisplay::Remaining.render(engine.current_time(), engine.duration()),
        chapter
    );
}

fn main() -> core_playback::Result<()> {
    let media = Arc::new(ConsoleMedia::default());
    let engine = PlaybackEngine::new(media.clone(), EngineConfig::default());

    engine.subscribe(Arc::new(|event: &PlaybackEvent| {
        println!("  [event] {:?} at {:.1}", event.kind, event.current_time);
    }));

    println!("Loading book");
    engine.set_source(AudioSource::RemoteStream {
        url: "/v1/books/dune.m4b".to_string(),
    });
    engine.set_metadata(Arc::new(Metadata {
        chapters: vec![
            chapter(0, "Prologue", 0.0, 600.0),
            chapter(1, "Arrakis", 600.0, 1200.0),
            chapter(2, "Muad'Dib", 1200.0, 3600.0),
        ],
        format: Format {
            duration: Some("3600.000000".to_string()),
            tags: Tags {
                title: Some("Dune".to_string()),
                artist: Some("Frank Herbert".to_string()),
                ..Default::default()
            },
            ..Default::default()
        },
    }));

    println!("\nPlaying {:?}", engine.title());
    engine.play()?;
    for _ in 0..3 {
        media.advance(1.0);
        engine.time_update();
    }
    print_clock(&engine);

    println!("\nSkip to next chapter");
    engine.skip_next();
    print_clock(&engine);

    println!("\nJump forward, then skip back within the tolerance");
    engine.jump(3.0);
    engine.skip_previous();
    print_clock(&engine);

    println!("\nScrub past the end");
    engine.set_position(10_000.0);
    print_clock(&engine);

    engine.pause();
    println!("\nSnapshot: {:?}", engine.snapshot());
    Ok(())
}
