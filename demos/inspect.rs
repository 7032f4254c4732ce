use image_tamper_check::{
    AnalysisConfig, ForensicsSession, error::Result, report::JsonReport,
};

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        eprintln!("usage: inspect <image> [ela-output.png] [--json]");
        std::process::exit(2);
    };

    let mut config = AnalysisConfig::default();
    let mut json = false;
    for arg in args {
        if arg == "--json" {
            json = true;
        } else {
            config = config.with_ela_output(arg);
        }
    }

    let mut session = ForensicsSession::with_config(config);
    session.load(&path)?;
    let report = session.full_report()?;

    if json {
        match JsonReport::from(&report).to_json() {
            Ok(text) => println!("{}", text),
            Err(e) => eprintln!("failed to serialize report: {}", e),
        }
        return Ok(());
    }

    println!("Analyzing {} ({} bytes)", report.path.display(), report.byte_len);
    println!();

    match &report.signature {
        Ok(verdict) => println!("Signature: {}", verdict),
        Err(e) => println!("Signature: {}", e),
    }
    match &report.digest {
        Ok(digest) => println!("{}", digest),
        Err(e) => println!("Hash: {}", e),
    }
    match &report.ela {
        Ok(ela) => println!(
            "{} (max difference {:.1}, {:.2}% flagged)",
            ela,
            ela.max_difference,
            ela.flagged_ratio * 100.0
        ),
        Err(e) => println!("Error performing ELA: {}", e),
    }
    match &report.steganography {
        Ok(verdict) => println!("{}", verdict),
        Err(e) => println!("Steganography check: {}", e),
    }
    match &report.metadata {
        Ok(metadata) => {
            println!();
            println!("{}", metadata);
            for indicator in &metadata.indicators {
                println!("  ! {}", indicator);
            }
        }
        Err(e) => println!("EXIF: {}", e),
    }

    Ok(())
}
