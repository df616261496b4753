/// stlview terminal viewer
///
/// Usage: stlview-terminal <url-or-directory> <file.stl> [more.stl ...]
///
/// Fetches the STL file, shows it as rotating ASCII art and lets the
/// keyboard orbit the camera. Extra file names form a playlist cycled
/// with the Tab key, each swap replacing the loaded mesh.
use stlview_terminal::{AppError, TerminalApp};
use stlview_viewer::ViewerInputs;

fn main() -> Result<(), AppError> {
    simple_logger::init_with_level(log::Level::Warn).unwrap();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: {} <url-or-directory> <file.stl> [more.stl ...]", args[0]);
        eprintln!("\nExample: {} https://host/models/ part.stl", args[0]);
        std::process::exit(2);
    }

    let inputs = ViewerInputs::new(&args[1], &args[2]);
    let mut app = TerminalApp::new(inputs)?;
    app.set_playlist(args[2..].to_vec());
    app.run()?;
    app.shutdown();

    Ok(())
}
