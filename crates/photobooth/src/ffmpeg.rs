//! ffmpeg-backed filters and animation encoders.
//!
//! Shells out to an `ffmpeg` binary. Frames are fed through the concat
//! demuxer so each photo is shown for exactly the configured frame delay.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use photobooth_core::{AnimationEncoder, Error, FilterBackend, GifOptions, PhotoFilter, Result};

/// Video filter graph for a photo filter; `None` means a plain copy.
pub fn filter_graph(filter: PhotoFilter) -> Option<&'static str> {
    match filter {
        PhotoFilter::None => None,
        PhotoFilter::BlackAndWhite => Some("hue=s=0"),
        PhotoFilter::Sepia => Some(
            "colorchannelmixer=.393:.769:.189:0:.349:.686:.168:0:.272:.534:.131",
        ),
        PhotoFilter::Vintage => Some("curves=preset=vintage"),
        PhotoFilter::Warm => Some("colortemperature=temperature=4500"),
        PhotoFilter::Cool => Some("colortemperature=temperature=9000"),
        PhotoFilter::Vivid => Some("eq=saturation=1.5:contrast=1.1"),
    }
}

/// Frame order for a seamless loop: forward, then back without repeating the ends.
pub fn loop_frames(photos: &[PathBuf]) -> Vec<PathBuf> {
    let mut frames = photos.to_vec();
    if photos.len() > 2 {
        frames.extend(photos[1..photos.len() - 1].iter().rev().cloned());
    }
    frames
}

/// Concat demuxer script showing each frame for `frame_delay_ms`.
pub fn concat_script(frames: &[PathBuf], frame_delay_ms: u64) -> String {
    let duration = frame_delay_ms as f64 / 1000.0;
    let mut script = String::from("ffconcat version 1.0\n");
    for frame in frames {
        script.push_str(&format!("file '{}'\n", escape(frame)));
        script.push_str(&format!("duration {:.3}\n", duration));
    }
    // The demuxer ignores the last duration unless the final file repeats
    if let Some(last) = frames.last() {
        script.push_str(&format!("file '{}'\n", escape(last)));
    }
    script
}

fn escape(path: &Path) -> String {
    path.to_string_lossy().replace('\'', r"'\''")
}

/// Palette size for a GIF quality between 1 and 100.
pub fn palette_colors(quality: u8) -> u32 {
    (u32::from(quality.min(100)) * 256 / 100).clamp(2, 256)
}

/// Arguments to filter one still image.
pub fn build_filter_args(input: &Path, output: &Path, graph: &str) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-i".to_string(),
        input.to_string_lossy().to_string(),
        "-vf".to_string(),
        graph.to_string(),
        "-q:v".to_string(),
        "2".to_string(),
        output.to_string_lossy().to_string(),
    ]
}

/// Arguments to encode an H.264 MP4 from a concat script.
pub fn build_video_args(script: &Path, output: &Path) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-f".to_string(),
        "concat".to_string(),
        "-safe".to_string(),
        "0".to_string(),
        "-i".to_string(),
        script.to_string_lossy().to_string(),
        "-vf".to_string(),
        "scale=trunc(iw/2)*2:trunc(ih/2)*2,format=yuv420p".to_string(),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-movflags".to_string(),
        "+faststart".to_string(),
        output.to_string_lossy().to_string(),
    ]
}

/// Arguments to encode an endlessly looping GIF from a concat script.
pub fn build_gif_args(script: &Path, output: &Path, options: GifOptions) -> Vec<String> {
    let graph = format!(
        "scale={}:{}:force_original_aspect_ratio=decrease:flags=lanczos,\
         split[a][b];[a]palettegen=max_colors={}[p];[b][p]paletteuse",
        options.max_width,
        options.max_height,
        palette_colors(options.quality)
    );
    vec![
        "-y".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-f".to_string(),
        "concat".to_string(),
        "-safe".to_string(),
        "0".to_string(),
        "-i".to_string(),
        script.to_string_lossy().to_string(),
        "-vf".to_string(),
        graph,
        "-loop".to_string(),
        "0".to_string(),
        output.to_string_lossy().to_string(),
    ]
}

/// Handle on an ffmpeg executable.
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    program: PathBuf,
}

impl Default for Ffmpeg {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl Ffmpeg {
    /// Use the binary at `program` (looked up on `PATH` when not absolute).
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Run ffmpeg to completion. The child is killed if the future is dropped.
    pub async fn run(&self, args: &[String]) -> Result<()> {
        debug!("Running {} {}", self.program.display(), args.join(" "));
        let output = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                Error::Encoder(format!(
                    "failed to execute {}: {}",
                    self.program.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Encoder(format!(
                "ffmpeg exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }

    async fn encode(
        &self,
        frames: &[PathBuf],
        frame_delay_ms: u64,
        output: &Path,
        args: Vec<String>,
    ) -> Result<PathBuf> {
        let script = ConcatScript {
            path: script_path(output),
        };
        tokio::fs::write(&script.path, concat_script(frames, frame_delay_ms)).await?;

        self.run(&args).await?;
        Ok(output.to_path_buf())
    }
}

fn script_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_owned();
    name.push(".ffconcat");
    PathBuf::from(name)
}

/// Concat script on disk, removed on drop.
///
/// Dropping covers an encode abandoned mid-run as well as one that finished.
struct ConcatScript {
    path: PathBuf,
}

impl Drop for ConcatScript {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove {}: {}", self.path.display(), e),
        }
    }
}

/// [`FilterBackend`] running each photo through an ffmpeg filter graph.
#[derive(Debug, Clone, Default)]
pub struct FfmpegFilterBackend {
    ffmpeg: Ffmpeg,
}

impl FfmpegFilterBackend {
    /// Filter with the given ffmpeg.
    pub fn new(ffmpeg: Ffmpeg) -> Self {
        Self { ffmpeg }
    }
}

#[async_trait]
impl FilterBackend for FfmpegFilterBackend {
    async fn apply_filter(
        &self,
        input: &Path,
        output: &Path,
        filter: PhotoFilter,
    ) -> Result<PathBuf> {
        match filter_graph(filter) {
            None => {
                tokio::fs::copy(input, output).await?;
            }
            Some(graph) => {
                self.ffmpeg
                    .run(&build_filter_args(input, output, graph))
                    .await
                    .map_err(|e| Error::Filter(e.to_string()))?;
            }
        }
        Ok(output.to_path_buf())
    }
}

/// [`AnimationEncoder`] producing MP4 and GIF loops with ffmpeg.
#[derive(Debug, Clone, Default)]
pub struct FfmpegEncoder {
    ffmpeg: Ffmpeg,
}

impl FfmpegEncoder {
    /// Encode with the given ffmpeg.
    pub fn new(ffmpeg: Ffmpeg) -> Self {
        Self { ffmpeg }
    }
}

#[async_trait]
impl AnimationEncoder for FfmpegEncoder {
    async fn generate_looping_video(
        &self,
        photos: &[PathBuf],
        output: &Path,
        frame_delay_ms: u64,
    ) -> Result<PathBuf> {
        let args = build_video_args(&script_path(output), output);
        self.ffmpeg
            .encode(&loop_frames(photos), frame_delay_ms, output, args)
            .await
    }

    async fn generate_looping_gif(
        &self,
        photos: &[PathBuf],
        output: &Path,
        frame_delay_ms: u64,
        options: GifOptions,
    ) -> Result<PathBuf> {
        let args = build_gif_args(&script_path(output), output, options);
        self.ffmpeg
            .encode(&loop_frames(photos), frame_delay_ms, output, args)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn test_loop_frames_ping_pong() {
        assert_eq!(
            loop_frames(&paths(&["1", "2", "3", "4"])),
            paths(&["1", "2", "3", "4", "3", "2"])
        );
        assert_eq!(loop_frames(&paths(&["1", "2"])), paths(&["1", "2"]));
    }

    #[test]
    fn test_concat_script() {
        let script = concat_script(&paths(&["/p/a.jpg", "/p/b.jpg"]), 500);
        assert_eq!(
            script,
            "ffconcat version 1.0\n\
             file '/p/a.jpg'\nduration 0.500\n\
             file '/p/b.jpg'\nduration 0.500\n\
             file '/p/b.jpg'\n"
        );
    }

    #[test]
    fn test_concat_script_escapes_quotes() {
        let script = concat_script(&paths(&["/p/it's.jpg"]), 250);
        assert!(script.contains(r"file '/p/it'\''s.jpg'"));
        assert!(script.contains("duration 0.250"));
    }

    #[test]
    fn test_palette_colors() {
        assert_eq!(palette_colors(100), 256);
        assert_eq!(palette_colors(50), 128);
        assert_eq!(palette_colors(1), 2);
        assert_eq!(palette_colors(255), 256);
    }

    #[test]
    fn test_build_filter_args() {
        let args = build_filter_args(Path::new("/in.jpg"), Path::new("/out.jpg"), "hue=s=0");
        assert_eq!(args[3], "-i");
        assert_eq!(args[4], "/in.jpg");
        assert_eq!(args[6], "hue=s=0");
        assert_eq!(args.last().unwrap(), "/out.jpg");
    }

    #[test]
    fn test_build_gif_args() {
        let options = GifOptions {
            max_width: 640,
            max_height: 480,
            quality: 50,
        };
        let args = build_gif_args(Path::new("/a.ffconcat"), Path::new("/a.gif"), options);
        let graph = &args[10];
        assert!(graph.starts_with("scale=640:480:"));
        assert!(graph.contains("max_colors=128"));
        assert_eq!(args[11], "-loop");
        assert_eq!(args[12], "0");
    }

    #[test]
    fn test_build_video_args() {
        let args = build_video_args(Path::new("/a.mp4.ffconcat"), Path::new("/a.mp4"));
        assert!(args.contains(&"libx264".to_string()));
        assert_eq!(args.last().unwrap(), "/a.mp4");
    }

    #[test]
    fn test_every_filter_but_none_has_graph() {
        assert!(filter_graph(PhotoFilter::None).is_none());
        for filter in [
            PhotoFilter::BlackAndWhite,
            PhotoFilter::Sepia,
            PhotoFilter::Vintage,
            PhotoFilter::Warm,
            PhotoFilter::Cool,
            PhotoFilter::Vivid,
        ] {
            assert!(filter_graph(filter).is_some(), "{filter} has no graph");
        }
    }

    #[tokio::test]
    async fn test_missing_binary_is_encoder_error() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = FfmpegEncoder::new(Ffmpeg::new(dir.path().join("no-ffmpeg")));
        let output = dir.path().join("anim.mp4");

        let result = encoder
            .generate_looping_video(&paths(&["/p/a.jpg", "/p/b.jpg"]), &output, 500)
            .await;

        assert!(matches!(result, Err(Error::Encoder(_))));
        // The concat script is cleaned up even on failure
        assert!(!dir.path().join("anim.mp4.ffconcat").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_abandoned_encode_removes_concat_script() {
        use std::os::unix::fs::PermissionsExt;
        use std::time::Duration;

        let dir = tempfile::tempdir().unwrap();
        let program = dir.path().join("slow-ffmpeg");
        std::fs::write(&program, "#!/bin/sh\nexec sleep 30\n").unwrap();
        std::fs::set_permissions(&program, std::fs::Permissions::from_mode(0o755)).unwrap();

        let encoder = FfmpegEncoder::new(Ffmpeg::new(&program));
        let output = dir.path().join("anim.gif");
        let script = dir.path().join("anim.gif.ffconcat");
        let frames = paths(&["/p/a.jpg", "/p/b.jpg"]);
        let options = GifOptions {
            max_width: 320,
            max_height: 320,
            quality: 80,
        };

        let mut encode = Box::pin(encoder.generate_looping_gif(&frames, &output, 500, options));
        let written = tokio::time::timeout(Duration::from_secs(5), async {
            tokio::select! {
                result = &mut encode => panic!("encode finished early: {result:?}"),
                _ = async {
                    while !script.exists() {
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                } => {}
            }
        })
        .await;
        assert!(written.is_ok());

        drop(encode);
        assert!(!script.exists());
    }

    #[tokio::test]
    async fn test_unfiltered_copy_needs_no_binary() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("a.jpg");
        std::fs::write(&input, b"jpeg").unwrap();
        let backend = FfmpegFilterBackend::new(Ffmpeg::new(dir.path().join("no-ffmpeg")));

        let output = backend
            .apply_filter(&input, &dir.path().join("a_none.jpg"), PhotoFilter::None)
            .await
            .unwrap();
        assert_eq!(std::fs::read(output).unwrap(), b"jpeg");
    }
}
