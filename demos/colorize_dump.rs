// demos/colorize_dump.rs
//
// Colorize raw depth dumps and write them as PNG.
//
// Usage:
//   cargo run --example colorize_dump -- <resolution> <out_dir> <frame.raw>...
//
// Each input file holds one packed little-endian u16 depth frame at the given
// resolution, named either by variant (R640x480) or by size (640x480).
// Frames are fed through the temporal tracker in order, so
// RUST_LOG=depthbridge=debug shows detection and tracking per frame.
//
// DEPTHBRIDGE_CONFIG may name a JSON tracker config; missing fields keep
// their defaults. With "palette": {"encoding": "KinectPacked"} the summary
// also counts pixels tagged with a player index.
//
// Output:
//   <out_dir>/<name>.png          -- colorized depth
//   <out_dir>/<name>_delta.png    -- colorized delta against the previous frame
//   stdout                        -- per-frame feature and player summary

use depthbridge::delta::colorize_depth_delta;
use depthbridge::frame::SensorFrame;
use depthbridge::resolution::Resolution;
use depthbridge::tracking::{DepthTracker, DepthTrackerState, TrackerConfig};

use std::env;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use tracing_subscriber::EnvFilter;

fn parse_resolution(name: &str) -> Option<Resolution> {
    if let Some((w, h)) = name.split_once(['x', 'X']) {
        if let (Ok(w), Ok(h)) = (w.parse(), h.parse()) {
            return Resolution::from_size(w, h);
        }
    }
    Resolution::ALL
        .into_iter()
        .find(|r| format!("{r:?}").eq_ignore_ascii_case(name))
}

fn load_config() -> Result<TrackerConfig, Box<dyn Error>> {
    match env::var("DEPTHBRIDGE_CONFIG") {
        Ok(path) => Ok(serde_json::from_str(&fs::read_to_string(path)?)?),
        Err(_) => Ok(TrackerConfig::default()),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 4 {
        eprintln!("Usage: {} <resolution> <out_dir> <frame.raw>...", args[0]);
        eprintln!("  resolution: R80x60, R320x240, R640x480, R1280x960 or WxH");
        std::process::exit(1);
    }

    let resolution =
        parse_resolution(&args[1]).ok_or_else(|| format!("unknown resolution {}", args[1]))?;
    let out_dir = PathBuf::from(&args[2]);
    fs::create_dir_all(&out_dir)?;

    let tracker = DepthTracker::try_new(load_config()?)?;
    let encoding = tracker.config().palette.encoding;
    let mut state = DepthTrackerState::new();

    for input in &args[3..] {
        let path = Path::new(input);
        let bytes = fs::read(path)?;
        let expected = resolution.width() * resolution.height() * 2;
        if bytes.len() < expected {
            return Err(format!("{input}: {} bytes, need {expected}", bytes.len()).into());
        }

        let frame = SensorFrame::new(&bytes, resolution.width() * 2, resolution);
        let depth = frame.depth_image()?;

        let delta = match state.previous_depth() {
            Some(prev) => Some(colorize_depth_delta(prev, &depth, &tracker.config().palette)?),
            None => None,
        };
        let out = tracker.colorize_with_temporal_tracking(&depth, &mut state);

        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("frame");
        out.colorized
            .to_rgba_image()
            .save(out_dir.join(format!("{stem}.png")))?;
        if let Some(delta) = delta {
            delta
                .to_rgba_image()
                .save(out_dir.join(format!("{stem}_delta.png")))?;
        }

        let players = depth
            .pixels()
            .filter(|&(_, _, s)| encoding.player_index(s) != 0)
            .count();
        match &out.tracking {
            Ok(t) => println!(
                "{stem}: {:?}, {} features, {} tracked, {players} player pixels",
                t.mode,
                t.features.len(),
                t.tracked_count()
            ),
            Err(e) => println!("{stem}: tracking failed: {e}, {players} player pixels"),
        }
    }

    Ok(())
}
