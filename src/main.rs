//! BabelTest adapter entry point

fn main() {
    // stderr only: stdout is the protocol channel
    let switch = babeltest::logging::init();

    babeltest::cli::run(switch);
}
