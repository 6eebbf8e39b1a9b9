//! Command line arguments.

use std::path::PathBuf;

use clap::Parser;

use photobooth_core::{EventRef, PhotoFilter, TemplateRef};

/// Replays a directory of captured photos through one kiosk session
#[derive(Parser, Debug, Clone)]
#[command(name = "photobooth")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Directory of captured photos (jpg, jpeg, png)
    #[arg(long, value_name = "DIR")]
    pub photos: PathBuf,

    /// YAML configuration file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Event id
    #[arg(long, value_name = "ID", default_value = "walk-in")]
    pub event: String,

    /// Event display name (defaults to the event id)
    #[arg(long, value_name = "NAME")]
    pub event_name: Option<String>,

    /// Template size, e.g. 2x6 or 6x4
    #[arg(long, value_name = "WxH", default_value = "2x6", value_parser = parse_template)]
    pub template: TemplateRef,

    /// Photos required (defaults to session.default_photo_count)
    #[arg(long, value_name = "N")]
    pub count: Option<u32>,

    /// Filter applied after the last capture: none, bw, sepia, vintage, warm, cool or vivid
    #[arg(long, value_name = "NAME", default_value = "none")]
    pub filter: PhotoFilter,

    /// Composed display image to attach
    #[arg(long, value_name = "FILE")]
    pub composed: Option<PathBuf>,

    /// Separate print image for the composed display image
    #[arg(long, value_name = "FILE", requires = "composed")]
    pub print: Option<PathBuf>,

    /// ffmpeg binary
    #[arg(long, value_name = "PATH", default_value = "ffmpeg")]
    pub ffmpeg: PathBuf,

    /// Keep the session until the auto-clear timer fires
    #[arg(long)]
    pub wait_auto_clear: bool,
}

impl Args {
    /// Event the session belongs to.
    pub fn event_ref(&self) -> EventRef {
        let name = self.event_name.as_deref().unwrap_or(&self.event);
        EventRef::new(self.event.clone(), name)
    }
}

/// Parse a `WxH` template size.
fn parse_template(raw: &str) -> Result<TemplateRef, String> {
    let (width, height) = raw
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("template must look like WxH, got '{}'", raw))?;
    let width: f64 = width
        .trim()
        .parse()
        .map_err(|e| format!("invalid template width in '{}': {}", raw, e))?;
    let height: f64 = height
        .trim()
        .parse()
        .map_err(|e| format!("invalid template height in '{}': {}", raw, e))?;
    if width <= 0.0 || height <= 0.0 {
        return Err(format!("template dimensions must be positive, got '{}'", raw));
    }
    Ok(TemplateRef::new(
        format!("template-{}", raw),
        raw.to_string(),
        width,
        height,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    fn parse(args: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("photobooth").chain(args.iter().copied()))
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["--photos", "/shots"]).unwrap();
        assert_eq!(args.photos, PathBuf::from("/shots"));
        assert_eq!(args.event_ref(), EventRef::new("walk-in", "walk-in"));
        assert_eq!(args.template.width, 2.0);
        assert_eq!(args.template.height, 6.0);
        assert_eq!(args.filter, PhotoFilter::None);
        assert_eq!(args.count, None);
        assert_eq!(args.ffmpeg, PathBuf::from("ffmpeg"));
        assert!(!args.wait_auto_clear);
    }

    #[test]
    fn test_all_options() {
        let args = parse(&[
            "--photos",
            "/shots",
            "--config",
            "booth.yaml",
            "--event",
            "evt-7",
            "--event-name",
            "Launch Party",
            "--template",
            "6x4",
            "--count",
            "3",
            "--filter",
            "sepia",
            "--composed",
            "strip.jpg",
            "--print",
            "sheet.jpg",
            "--ffmpeg",
            "/opt/ffmpeg",
            "--wait-auto-clear",
        ])
        .unwrap();

        assert_eq!(args.config, Some(PathBuf::from("booth.yaml")));
        assert_eq!(args.event_ref(), EventRef::new("evt-7", "Launch Party"));
        assert_eq!(args.template.id, "template-6x4");
        assert_eq!(args.count, Some(3));
        assert_eq!(args.filter, PhotoFilter::Sepia);
        assert_eq!(args.composed, Some(PathBuf::from("strip.jpg")));
        assert_eq!(args.print, Some(PathBuf::from("sheet.jpg")));
        assert_eq!(args.ffmpeg, PathBuf::from("/opt/ffmpeg"));
        assert!(args.wait_auto_clear);
    }

    #[test]
    fn test_help() {
        let err = parse(&["--help"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_errors() {
        let kind = |args: &[&str]| parse(args).unwrap_err().kind();

        assert_eq!(kind(&[]), ErrorKind::MissingRequiredArgument);
        assert!(parse(&["--photos"]).is_err());
        assert!(parse(&["--photos", "/x", "--count", "many"]).is_err());
        assert_eq!(kind(&["--photos", "/x", "--bogus"]), ErrorKind::UnknownArgument);
        assert_eq!(
            kind(&["--photos", "/x", "--filter", "lomo"]),
            ErrorKind::ValueValidation
        );
        assert_eq!(
            kind(&["--photos", "/x", "--template", "wide"]),
            ErrorKind::ValueValidation
        );
        assert_eq!(
            kind(&["--photos", "/x", "--template", "0x6"]),
            ErrorKind::ValueValidation
        );
        assert_eq!(
            kind(&["--photos", "/x", "--print", "p.jpg"]),
            ErrorKind::MissingRequiredArgument
        );
    }

    #[test]
    fn test_command_definition() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
