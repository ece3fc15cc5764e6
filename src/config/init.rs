// ABOUTME: Config scaffolding for new installations.
// ABOUTME: Creates a commented voyager.yml template.

use std::path::Path;

use crate::error::{Error, Result};

use super::CONFIG_FILENAME;

pub fn init_config(dir: &Path, domain: Option<&str>, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let domain = domain.unwrap_or("example.com");
    if domain.trim().is_empty() || domain.contains(char::is_whitespace) {
        return Err(Error::InvalidConfig(format!("invalid domain: {domain:?}")));
    }

    std::fs::write(&config_path, generate_template_yaml(domain))?;
    Ok(())
}

fn generate_template_yaml(domain: &str) -> String {
    format!(
        r#"domain: {domain}
public_ip:
  env: VOYAGER_PUBLIC_IP
  default: 127.0.0.1
deployments_dir: /var/opt/voyager/deployments

source:
  base_url: https://github.com
  organization: my-org
  token:
    env: GITHUB_PAT

store:
  backend: file
  path: /var/lib/voyager/registry
  # locks: /var/lib/voyager/locks

dns:
  provider: disabled
  # provider: cloudflare
  # zone:
  #   env: CLOUDFLARE_ZONE
  # token:
  #   env: CLOUDFLARE_API_TOKEN

notifications:
  operators:
    env: DISCORD_WEBHOOK
    default: ""

# proxy:
#   caddyfile: /opt/voyager/caddy/Caddyfile
"#
    )
}
