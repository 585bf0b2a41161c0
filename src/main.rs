//! Hex map viewer.
//!
//! Generates (or loads) a hex map and renders its chunks. With `--headless`
//! the map is generated and saved without opening a window.

use bevy::app::AppExit;
use bevy::prelude::*;
use bevy_inspector_egui::quick::WorldInspectorPlugin;

use hex_map::GameState;
use hex_map::view::{HexMapConfig, HexMapPlugin};

#[cfg(feature = "native")]
mod cli {
    use clap::Parser;

    use hex_map::view::HexMapConfig;

    /// Command line overrides for the map configuration.
    #[derive(Parser, Debug)]
    #[command(name = "hex-map")]
    #[command(about = "Generate, view and save hexagonal tile maps")]
    pub struct Args {
        /// Cells along X (multiple of 5)
        #[arg(short = 'W', long)]
        pub width: Option<usize>,

        /// Cells along Z (multiple of 5)
        #[arg(short = 'H', long)]
        pub height: Option<usize>,

        /// Generator seed (random if not specified)
        #[arg(short, long)]
        pub seed: Option<u64>,

        /// Wrap the map east to west
        #[arg(long)]
        pub wrap: bool,

        /// Start from a flat map instead of generating one
        #[arg(long)]
        pub flat: bool,

        /// Load this map file at startup
        #[arg(short, long)]
        pub load: Option<String>,

        /// Save path for F5/F9 and for --headless
        #[arg(long)]
        pub save: Option<String>,

        /// Generate and save without opening a window
        #[arg(long)]
        pub headless: bool,
    }

    impl Args {
        /// Applies the overrides on top of `cfg`.
        pub fn apply(&self, cfg: &mut HexMapConfig) {
            if let Some(width) = self.width {
                cfg.grid.width = width;
            }
            if let Some(height) = self.height {
                cfg.grid.height = height;
            }
            if let Some(seed) = self.seed {
                cfg.generator.seed = seed;
                cfg.generator.use_fixed_seed = true;
            }
            cfg.grid.wrapping |= self.wrap;
            cfg.grid.generate &= !self.flat;
            if self.load.is_some() {
                cfg.grid.load_path.clone_from(&self.load);
            }
            if let Some(save) = &self.save {
                cfg.grid.save_path.clone_from(save);
            }
        }
    }
}

fn main() -> AppExit {
    #[allow(unused_mut)]
    let mut cfg = HexMapConfig::default();

    #[cfg(feature = "native")]
    {
        use clap::Parser;

        let args = cli::Args::parse();
        args.apply(&mut cfg);
        if args.headless {
            return run_headless(&cfg);
        }
    }

    let mut app = App::new();

    app.add_plugins(DefaultPlugins.set(WindowPlugin {
        primary_window: Some(Window {
            title: "Hex Map".into(),
            ..default()
        }),
        ..default()
    }))
    .register_type::<GameState>()
    .init_state::<GameState>()
    .add_plugins(bevy_egui::EguiPlugin::default())
    .add_plugins(HexMapPlugin(cfg))
    .add_systems(Update, exit_on_esc)
    .add_systems(Update, toggle_inspector)
    .add_plugins(WorldInspectorPlugin::new().run_if(in_state(GameState::Debugging)));

    #[cfg(feature = "native")]
    {
        use bevy::remote::{RemotePlugin, http::RemoteHttpPlugin};
        app.add_plugins(RemotePlugin::default())
            .add_plugins(RemoteHttpPlugin::default());
    }

    app.run()
}

/// Generates the configured map and writes it to the save path.
#[cfg(feature = "native")]
fn run_headless(cfg: &HexMapConfig) -> AppExit {
    use std::path::Path;

    use hex_map::generator;
    use hex_map::grid::HexGrid;
    use hex_map::metrics::HexMetrics;

    // Only for the log subscriber.
    let mut app = App::new();
    app.add_plugins(bevy::log::LogPlugin::default());

    let settings = &cfg.grid;
    let mut grid = HexGrid::new(HexMetrics::new(settings.noise_seed, settings.hash_seed));
    let Some(report) = generator::generate_map(
        &mut grid,
        &cfg.generator,
        settings.width,
        settings.height,
        settings.wrapping,
    ) else {
        return AppExit::error();
    };
    if report.unused_land_budget > 0 || report.unused_river_budget > 0 {
        warn!(
            "Budgets left over: land {}, rivers {}",
            report.unused_land_budget, report.unused_river_budget
        );
    }
    if grid.save_map_file(Path::new(&settings.save_path)) {
        info!("Seed {}", report.seed);
        AppExit::Success
    } else {
        AppExit::error()
    }
}

fn toggle_inspector(
    keys: Res<ButtonInput<KeyCode>>,
    state: Res<State<GameState>>,
    mut next: ResMut<NextState<GameState>>,
) {
    if keys.just_pressed(KeyCode::Tab) {
        next.set(match state.get() {
            GameState::Running => GameState::Debugging,
            GameState::Debugging => GameState::Running,
        });
    }
}

fn exit_on_esc(keys: Res<ButtonInput<KeyCode>>, mut exit: MessageWriter<AppExit>) {
    if keys.just_pressed(KeyCode::Escape) {
        exit.write(AppExit::Success);
    }
}
