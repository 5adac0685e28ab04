use std::env;
use std::path::PathBuf;

const WATCHED: [&str; 3] = ["FFMPEG_DIR", "VCPKG_ROOT", "VCPKGRS_TRIPLET"];

// ffmpeg-sys-next finds FFmpeg through pkg-config everywhere except
// Windows, where it needs FFMPEG_DIR. Only hint there; never fail the build.
fn main() {
    for name in WATCHED {
        println!("cargo:rerun-if-env-changed={name}");
    }

    if env::var("CARGO_CFG_TARGET_OS").as_deref() != Ok("windows")
        || env::var_os("FFMPEG_DIR").is_some()
    {
        return;
    }

    let Some(vcpkg_root) = env::var_os("VCPKG_ROOT") else {
        println!(
            "cargo:warning=clipsampler needs the FFmpeg development libraries; set FFMPEG_DIR to an FFmpeg install (for example one made with vcpkg)."
        );
        return;
    };

    let triplet = env::var("VCPKGRS_TRIPLET").unwrap_or_else(|_| "x64-windows".to_string());
    let candidate = PathBuf::from(vcpkg_root).join("installed").join(triplet);
    if candidate.is_dir() {
        println!(
            "cargo:warning=FFMPEG_DIR is unset; a vcpkg FFmpeg exists at {}. Point FFMPEG_DIR there if linking fails.",
            candidate.display()
        );
    } else {
        println!(
            "cargo:warning=FFMPEG_DIR is unset and VCPKG_ROOT has no FFmpeg under {}.",
            candidate.display()
        );
    }
}
