use clap::Parser;
use stepsolve::App;

fn main() -> miette::Result<()> {
    let app = App::parse();
    app.init_logging();
    app.run()
}
