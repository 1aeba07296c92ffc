use std::path::Path;

use tracing::info;

use tether_core::config::{
    DatabaseConfig, DiscordConfig, RobloxConfig, SessionConfig, TetherConfig, TetherSection,
};
use tether_core::db::DatabasePool;

/// A starter catalog so the dashboard has something to bind against.
const STARTER_GROUPS: &str = r#"{
  "Eden": {
    "Ranks": {
      "1": "Subject",
      "2": "Tester",
      "3": "Officer",
      "4": "Commander",
      "5": "Overseer"
    },
    "Classes": { "Officer": 3, "Command": 4 }
  }
}
"#;

/// Run the `init` command: create the data directory, write a default config
/// and starter group catalog, and set up the database.
pub async fn run(data_dir: &str) -> anyhow::Result<()> {
    let data_path = Path::new(data_dir);

    if !data_path.exists() {
        std::fs::create_dir_all(data_path)?;
        info!("Created data directory: {}", data_dir);
    }

    let db_path = data_path.join("tether.db");
    let groups_path = data_path.join("groups.json");

    if !groups_path.exists() {
        std::fs::write(&groups_path, STARTER_GROUPS)?;
        info!("Wrote starter group catalog: {}", groups_path.display());
    }

    let config = TetherConfig {
        tether: TetherSection {
            data_dir: data_dir.to_string(),
            public_url: None,
            database: DatabaseConfig {
                path: Some(db_path.to_string_lossy().to_string()),
            },
            groups_path: groups_path.to_string_lossy().to_string(),
        },
        discord: DiscordConfig::default(),
        roblox: RobloxConfig::default(),
        session: SessionConfig::default(),
    };

    let config_path = data_path.join("tether.toml");
    let rendered = toml::to_string_pretty(&config)?;
    std::fs::write(&config_path, rendered)?;
    info!("Wrote configuration: {}", config_path.display());

    let connect_str = format!("sqlite:{}?mode=rwc", db_path.to_string_lossy());
    DatabasePool::new_sqlite(&connect_str).await?;
    info!("Database created: {}", db_path.display());

    println!("Initialized Tether in {data_dir}");
    println!("Fill in the [discord] and [roblox] credentials in {}", config_path.display());
    Ok(())
}
