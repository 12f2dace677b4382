//! Audible cue for high and critical incidents.
//!
//! The terminal bell is always available. With the `sound` feature a short
//! sine tone is synthesized on a dedicated audio thread instead, falling
//! back to the bell when no output device can be opened.

use std::io::Write;
use std::sync::Arc;

use sentinel_core::{AlertTone, Incident};

/// Writes BEL to the terminal. Safe to interleave with ratatui output.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalBell;

impl AlertTone for TerminalBell {
    fn play(&self, _incident: &Incident) {
        let mut out = std::io::stdout().lock();
        let _ = out.write_all(b"\x07");
        let _ = out.flush();
    }
}

/// The best available tone for this build.
pub fn default_tone() -> Arc<dyn AlertTone> {
    #[cfg(feature = "sound")]
    {
        match synth::SineTone::spawn(sentinel_core::ALERT_TONE) {
            Ok(tone) => return Arc::new(tone),
            Err(e) => tracing::warn!(error = %e, "audio output unavailable, using terminal bell"),
        }
    }
    Arc::new(TerminalBell)
}

#[cfg(feature = "sound")]
mod synth {
    use std::sync::mpsc;
    use std::thread;

    use rodio::source::{SineWave, Source};
    use rodio::{OutputStreamBuilder, Sink};
    use tracing::{debug, warn};

    use sentinel_core::{AlertTone, Incident, ToneSpec};

    /// Plays [`ToneSpec`] beeps on a thread that owns the output stream.
    pub struct SineTone {
        tx: mpsc::Sender<()>,
    }

    impl SineTone {
        /// Open the default output device and start the audio thread.
        pub fn spawn(spec: ToneSpec) -> Result<Self, String> {
            let (tx, rx) = mpsc::channel::<()>();
            let (ready_tx, ready_rx) = mpsc::channel::<Result<(), String>>();

            thread::Builder::new()
                .name("alert-tone".into())
                .spawn(move || {
                    let mut stream = match OutputStreamBuilder::open_default_stream() {
                        Ok(stream) => stream,
                        Err(e) => {
                            let _ = ready_tx.send(Err(e.to_string()));
                            return;
                        }
                    };
                    // rodio prints to stderr on drop otherwise.
                    stream.log_on_drop(false);
                    let _ = ready_tx.send(Ok(()));

                    while rx.recv().is_ok() {
                        let sink = Sink::connect_new(stream.mixer());
                        sink.append(
                            SineWave::new(spec.frequency_hz)
                                .take_duration(spec.duration)
                                .amplify(spec.gain),
                        );
                        sink.sleep_until_end();
                    }
                    debug!("alert tone thread exiting");
                })
                .map_err(|e| e.to_string())?;

            ready_rx
                .recv()
                .map_err(|_| "audio thread exited during startup".to_owned())??;
            Ok(Self { tx })
        }
    }

    impl AlertTone for SineTone {
        fn play(&self, _incident: &Incident) {
            if self.tx.send(()).is_err() {
                warn!("alert tone thread is gone");
            }
        }
    }
}
