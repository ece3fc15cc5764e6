// ABOUTME: Traefik routing labels for deployment images.
// ABOUTME: One router plus one load-balanced service per host, TLS enabled.

use std::collections::HashMap;

/// Router/service name derived from the host: `demo-preview.example.com` becomes
/// `voyager-demo-preview-example-com`.
pub fn router_name(host: &str) -> String {
    let slug: String = host
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    format!("voyager-{}", slug.trim_matches('-'))
}

pub fn labels(host: &str, internal_port: u16, entrypoints: &str) -> HashMap<String, String> {
    let router = router_name(host);
    let service = format!("{}-service", router);

    HashMap::from([
        ("traefik.enable".to_string(), "true".to_string()),
        (
            format!("traefik.http.routers.{router}.entrypoints"),
            entrypoints.to_string(),
        ),
        (
            format!("traefik.http.routers.{router}.rule"),
            format!("Host(`{host}`)"),
        ),
        (
            format!("traefik.http.routers.{router}.service"),
            service.clone(),
        ),
        (
            format!("traefik.http.services.{service}.loadbalancer.server.port"),
            internal_port.to_string(),
        ),
        (
            format!("traefik.http.routers.{router}.tls"),
            "true".to_string(),
        ),
    ])
}
