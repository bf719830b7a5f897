//! Entry point for the portal viewer.
//! Logging, command-line flags, then hand off to the platform event loop.

use std::path::PathBuf;

use anyhow::Result;
use platform::PortalOptions;

fn parse_backend(args: &[String]) -> wgpu::Backends {
    // --gpu-backend=auto|vulkan|dx12|metal|gl
    let mut backends = wgpu::Backends::all();
    for arg in args {
        if let Some(val) = arg.strip_prefix("--gpu-backend=") {
            backends = match val.to_ascii_lowercase().as_str() {
                "auto" => wgpu::Backends::all(),
                "vulkan" | "vk" => wgpu::Backends::VULKAN,
                "dx12" | "d3d12" => wgpu::Backends::DX12,
                "metal" | "mtl" => wgpu::Backends::METAL,
                "gl" | "opengl" | "gles" => wgpu::Backends::GL,
                other => {
                    log::warn!("Unknown backend '{other}', falling back to auto");
                    wgpu::Backends::all()
                }
            };
        }
    }
    backends
}

/// `--name` or `--name=on|off`.
fn parse_switch(args: &[String], name: &str) -> Option<bool> {
    let flag = format!("--{name}");
    for arg in args {
        if *arg == flag {
            return Some(true);
        }
        if let Some(val) = arg.strip_prefix(&flag).and_then(|rest| rest.strip_prefix('=')) {
            return Some(matches!(
                val.to_ascii_lowercase().as_str(),
                "1" | "true" | "on" | "yes"
            ));
        }
    }
    None
}

fn parse_value<T: std::str::FromStr>(args: &[String], name: &str) -> Option<T> {
    let prefix = format!("--{name}=");
    args.iter()
        .rev()
        .find_map(|arg| arg.strip_prefix(&prefix))
        .and_then(|v| match v.parse() {
            Ok(parsed) => Some(parsed),
            Err(_) => {
                log::warn!("Ignoring bad value for --{name}: '{v}'");
                None
            }
        })
}

fn parse_size(args: &[String]) -> (u32, u32) {
    let mut w = parse_value::<u32>(args, "width");
    let mut h = parse_value::<u32>(args, "height");

    if let Some(v) = args.iter().rev().find_map(|a| a.strip_prefix("--size=")) {
        let parsed = v
            .split_once('x')
            .or_else(|| v.split_once('X'))
            .and_then(|(sw, sh)| Some((sw.parse::<u32>().ok()?, sh.parse::<u32>().ok()?)));
        match parsed {
            Some((pw, ph)) => (w, h) = (Some(pw), Some(ph)),
            None => log::warn!("Ignoring bad --size '{v}', expected WxH"),
        }
    }

    (w.unwrap_or(1280).max(1), h.unwrap_or(720).max(1))
}

fn parse_options(args: &[String]) -> PortalOptions {
    let defaults = PortalOptions::default();
    let (width, height) = parse_size(args);
    let mut points = defaults.points;
    if let Some(count) = parse_value(args, "point-count") {
        points.count = count;
    }
    if let Some(size) = parse_value::<f32>(args, "point-size") {
        if size.is_finite() && size > 0.0 {
            points.size = size;
        }
    }

    PortalOptions {
        backends: parse_backend(args),
        show_fps: parse_switch(args, "show-fps").unwrap_or(false),
        width,
        height,
        antialias: !parse_switch(args, "no-msaa").unwrap_or(false),
        assets: parse_value::<PathBuf>(args, "assets").unwrap_or(defaults.assets),
        points,
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let options = parse_options(&args);
    log::info!(
        "Starting portal. Backend: {:?}, show_fps={}, window_size={}x{}, msaa={}, assets={}",
        options.backends,
        options.show_fps,
        options.width,
        options.height,
        options.antialias,
        options.assets.display()
    );

    platform::run(options)?;

    log::info!("Graceful shutdown. Bye!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn defaults() {
        let opts = parse_options(&[]);
        assert_eq!(opts.backends, wgpu::Backends::all());
        assert!(!opts.show_fps);
        assert!(opts.antialias);
        assert_eq!((opts.width, opts.height), (1280, 720));
        assert_eq!(opts.assets, PathBuf::from("static"));
        assert_eq!(opts.points.count, 500);
    }

    #[test]
    fn backend_names() {
        assert_eq!(parse_backend(&args(&["--gpu-backend=vk"])), wgpu::Backends::VULKAN);
        assert_eq!(parse_backend(&args(&["--gpu-backend=GL"])), wgpu::Backends::GL);
        assert_eq!(parse_backend(&args(&["--gpu-backend=nope"])), wgpu::Backends::all());
    }

    #[test]
    fn size_forms() {
        assert_eq!(parse_size(&args(&["--size=800x600"])), (800, 600));
        assert_eq!(parse_size(&args(&["--size=640X480"])), (640, 480));
        assert_eq!(parse_size(&args(&["--width=1024"])), (1024, 720));
        assert_eq!(parse_size(&args(&["--size=0x0"])), (1, 1));
        assert_eq!(parse_size(&args(&["--size=wide"])), (1280, 720));
    }

    #[test]
    fn switches_and_values() {
        let opts = parse_options(&args(&[
            "--show-fps=on",
            "--no-msaa",
            "--assets=/srv/portal",
            "--point-count=1500",
            "--point-size=-3",
        ]));
        assert!(opts.show_fps);
        assert!(!opts.antialias);
        assert_eq!(opts.assets, PathBuf::from("/srv/portal"));
        assert_eq!(opts.points.count, 1500);
        assert_eq!(opts.points.size, 10.0);

        // префикс не должен совпадать с другим флагом
        assert_eq!(parse_switch(&args(&["--show-fps-extra"]), "show-fps"), None);
    }
}
