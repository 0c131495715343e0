use crate::audio_manager::{AudioCue, AudioCueError, CueBackend};
use async_trait::async_trait;
use parking_lot::Mutex;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use std::collections::HashMap;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

type Clip = Arc<[u8]>;

/// Keeps the platform stream alive for as long as sinks are created from its handle.
struct OutputDevice {
    _stream: OutputStream,
    handle: OutputStreamHandle,
}

/// SAFETY: `OutputStream` is only held to keep the device open and is never touched after
/// construction. All playback goes through `OutputStreamHandle`, which is thread-safe.
unsafe impl Send for OutputDevice {}
unsafe impl Sync for OutputDevice {}

/// Plays the bundled mp3 clips on the default output device.
///
/// The device is opened in `prepare`, so a missing device surfaces as an initialization error the
/// user can retry.
pub struct RodioBackend {
    asset_dir: PathBuf,
    device: Mutex<Option<OutputDevice>>,
    clips: Mutex<HashMap<AudioCue, Clip>>,
    playing: Arc<Mutex<Vec<Arc<Sink>>>>,
}

impl RodioBackend {
    pub fn new(asset_dir: impl Into<PathBuf>) -> Self {
        Self {
            asset_dir: asset_dir.into(),
            device: Mutex::new(None),
            clips: Mutex::new(HashMap::new()),
            playing: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn open_device(&self) -> Result<(), AudioCueError> {
        let mut device = self.device.lock();
        if device.is_some() {
            return Ok(());
        }
        let (stream, handle) = OutputStream::try_default()
            .map_err(|err| AudioCueError::DeviceNotAvailable(err.to_string()))?;
        *device = Some(OutputDevice {
            _stream: stream,
            handle,
        });
        log::info!("Opened default audio output");
        Ok(())
    }

    fn new_sink(&self) -> Result<Sink, AudioCueError> {
        let device = self.device.lock();
        let device = device.as_ref().ok_or_else(|| {
            AudioCueError::DeviceNotAvailable("output device not opened".to_string())
        })?;
        Sink::try_new(&device.handle).map_err(|err| AudioCueError::PlaybackFailed(err.to_string()))
    }
}

fn load_clips(
    asset_dir: PathBuf,
    cues: Vec<AudioCue>,
) -> Result<HashMap<AudioCue, Clip>, AudioCueError> {
    let mut clips = HashMap::with_capacity(cues.len());
    for cue in cues {
        let path = asset_dir.join(cue.file_name());
        let bytes = std::fs::read(&path)
            .map_err(|err| AudioCueError::AssetMissing(format!("{}: {err}", path.display())))?;
        let clip: Clip = bytes.into();
        // Reject clips that will not decode now rather than mid-session.
        Decoder::new(Cursor::new(Arc::clone(&clip))).map_err(|err| {
            AudioCueError::AssetMissing(format!("{}: {err}", path.display()))
        })?;
        clips.insert(cue, clip);
    }
    Ok(clips)
}

/// Stops its sink when dropped, so an abandoned playback goes quiet.
struct SinkGuard {
    sink: Arc<Sink>,
    playing: Arc<Mutex<Vec<Arc<Sink>>>>,
}

impl SinkGuard {
    fn register(playing: &Arc<Mutex<Vec<Arc<Sink>>>>, sink: Arc<Sink>) -> Self {
        playing.lock().push(Arc::clone(&sink));
        Self {
            sink,
            playing: Arc::clone(playing),
        }
    }
}

impl Drop for SinkGuard {
    fn drop(&mut self) {
        self.sink.stop();
        self.playing
            .lock()
            .retain(|other| !Arc::ptr_eq(other, &self.sink));
    }
}

#[async_trait]
impl CueBackend for RodioBackend {
    async fn prepare(&self, cues: &[AudioCue]) -> Result<(), AudioCueError> {
        self.open_device()?;
        let asset_dir = self.asset_dir.clone();
        let wanted = cues.to_vec();
        let clips = tokio::task::spawn_blocking(move || load_clips(asset_dir, wanted))
            .await
            .map_err(|err| AudioCueError::AssetMissing(format!("clip loader failed: {err}")))??;
        log::info!(
            "Loaded {} audio cues from {}",
            clips.len(),
            self.asset_dir.display()
        );
        self.clips.lock().extend(clips);
        Ok(())
    }

    async fn play_to_end(&self, cue: AudioCue) -> Result<(), AudioCueError> {
        let clip = self
            .clips
            .lock()
            .get(&cue)
            .cloned()
            .ok_or_else(|| AudioCueError::AssetMissing(cue.file_name().to_string()))?;
        let source = Decoder::new(Cursor::new(clip))
            .map_err(|err| AudioCueError::PlaybackFailed(err.to_string()))?;
        let sink = Arc::new(self.new_sink()?);
        sink.append(source);

        let guard = SinkGuard::register(&self.playing, Arc::clone(&sink));
        let waiter = Arc::clone(&sink);
        tokio::task::spawn_blocking(move || waiter.sleep_until_end())
            .await
            .map_err(|err| AudioCueError::PlaybackFailed(err.to_string()))?;
        drop(guard);
        Ok(())
    }

    fn stop_all(&self) {
        for sink in self.playing.lock().drain(..) {
            sink.stop();
        }
    }
}
