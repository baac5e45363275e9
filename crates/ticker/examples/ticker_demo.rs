//! Ticker example - deferring work by frames on a 60 Hz ticker

use scheduler::{defer_frames, defer_frames_cancelable, defer_frames_p};
use ticker::{FrameEvent, TickerConfig, TickerFrameHost};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let host = TickerFrameHost::start(TickerConfig::default())?;
    println!("Ticker running at {} Hz", host.config().frame_rate);

    // Watch boundaries that actually did work
    let mut events = host.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let FrameEvent::Boundary { frame, callbacks } = event {
                if callbacks > 0 {
                    println!("Frame {}: {} callbacks", frame, callbacks);
                }
            }
        }
    });

    defer_frames(&host, 5, || println!("Five frames later"));

    let handle = defer_frames_cancelable(&host, 30, || println!("This never prints"));

    defer_frames_p(&host, 10).await;
    println!("Ten frames later, cancelling the 30-frame chain");
    handle.cancel()?;

    defer_frames_p(&host, 30).await;
    println!("Chain state: {:?}", handle.state());

    host.stop()?;
    println!("Stopped after {} frames", host.frame_count());

    Ok(())
}
