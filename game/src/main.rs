// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.

mod settings;

use engine::{ScriptEnvironment, TextureResource};
use env_logger::Env;
use log::{LevelFilter, error, info, warn};
use settings::Settings;
use std::cell::RefCell;
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;

const DEFAULT_SCRIPT: &str = "resources/scripts/texture_demo.lua";

/// Installs the logger before settings are read so settings warnings are
/// not lost. Without `RUST_LOG`, records are gated at `info` until the
/// configured level is known. Returns whether `RUST_LOG` took over.
fn init_logging() -> bool {
    let from_env = std::env::var_os("RUST_LOG").is_some();
    env_logger::Builder::from_env(Env::default().default_filter_or("trace")).init();
    if !from_env {
        log::set_max_level(LevelFilter::Info);
    }
    from_env
}

fn apply_log_level(level: &str) {
    match level.parse::<LevelFilter>() {
        Ok(filter) => log::set_max_level(filter),
        Err(_) => warn!("Unknown log level '{}', keeping info", level),
    }
}

fn main() -> ExitCode {
    let rust_log = init_logging();
    let settings = Settings::load_user_settings();
    if !rust_log {
        apply_log_level(&settings.logging.level);
    }

    let scripts: Vec<PathBuf> = match std::env::args_os().skip(1).map(PathBuf::from).collect::<Vec<_>>() {
        args if args.is_empty() => vec![PathBuf::from(DEFAULT_SCRIPT)],
        args => args,
    };

    let textures = Rc::new(RefCell::new(TextureResource::new()));
    let (normal_map, white) = {
        let mut textures = textures.borrow_mut();
        (
            textures.create_default_normal_map(),
            textures.create_solid_rgba([255, 255, 255, 255]),
        )
    };

    let env = match ScriptEnvironment::new(textures.clone(), settings.scripting) {
        Ok(env) => env,
        Err(e) => {
            error!("Failed to create script environment: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let exposed = env
        .set_global_texture("NormalMap", Some(normal_map))
        .and_then(|_| env.set_global_texture("White", Some(white)));
    if let Err(e) = exposed {
        error!("Failed to expose textures to scripts: {}", e);
        return ExitCode::FAILURE;
    }

    let mut failed = false;
    for script in &scripts {
        if let Err(e) = env.run_file(script) {
            error!("Script {:?} failed: {}", script, e);
            failed = true;
        }
    }

    if let Err(e) = env.collect_garbage() {
        error!("Garbage collection failed: {}", e);
    }
    info!(
        "Finished {} script(s); {} texture(s) loaded",
        scripts.len(),
        textures.borrow().len()
    );

    if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}
