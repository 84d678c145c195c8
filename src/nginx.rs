use std::fmt::Write;

pub const SITES_AVAILABLE: &str = "/etc/nginx/sites-available";
pub const SITES_ENABLED: &str = "/etc/nginx/sites-enabled";

/// Public port the site listens on, IPv4 and IPv6.
pub const LISTEN_PORT: u16 = 80;

/// Headers every proxied request carries upstream.
pub const PROXY_HEADERS: &[(&str, &str)] = &[
    ("Host", "$host"),
    ("X-Real-IP", "$remote_addr"),
    ("X-Forwarded-For", "$proxy_add_x_forwarded_for"),
    ("X-Forwarded-Proto", "$scheme"),
];

/// Reverse-proxy site definition for Nginx.
///
/// # Example
///
/// ```
/// use shipyard::NginxSite;
///
/// let site = NginxSite::new("app", "http://127.0.0.1:8080")
///     .server_name("203.0.113.5")
///     .proxy_headers();
///
/// let conf = site.render();
/// assert!(conf.contains("proxy_pass http://127.0.0.1:8080;"));
/// assert!(conf.contains("proxy_set_header X-Real-IP $remote_addr;"));
/// ```
#[derive(Debug, Clone)]
pub struct NginxSite {
    pub name: String,
    pub upstream: String,
    pub server_name: String,
    pub headers: Vec<(String, String)>,
}

impl NginxSite {
    #[must_use]
    pub fn new(name: &str, upstream: &str) -> Self {
        Self {
            name: name.to_string(),
            upstream: upstream.to_string(),
            server_name: "_".to_string(),
            headers: Vec::new(),
        }
    }

    #[must_use]
    pub fn server_name(mut self, name: &str) -> Self {
        self.server_name = name.to_string();
        self
    }

    /// Forward `Host`, `X-Real-IP`, `X-Forwarded-For` and
    /// `X-Forwarded-Proto`.
    #[must_use]
    pub fn proxy_headers(mut self) -> Self {
        for (name, value) in PROXY_HEADERS {
            self = self.header(name, value);
        }
        self
    }

    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    #[must_use]
    pub fn available_path(&self) -> String {
        format!("{SITES_AVAILABLE}/{}", self.name)
    }

    #[must_use]
    pub fn enabled_path(&self) -> String {
        format!("{SITES_ENABLED}/{}", self.name)
    }

    /// Render the `server` block.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        // Writing to a String cannot fail.
        let _ = self.write_to(&mut out);
        out
    }

    fn write_to(&self, out: &mut String) -> std::fmt::Result {
        writeln!(out, "server {{")?;
        writeln!(out, "    listen {LISTEN_PORT};")?;
        writeln!(out, "    listen [::]:{LISTEN_PORT};")?;
        writeln!(out, "    server_name {};", self.server_name)?;
        writeln!(out)?;
        writeln!(out, "    location / {{")?;
        writeln!(out, "        proxy_pass {};", self.upstream)?;
        for (name, value) in &self.headers {
            writeln!(out, "        proxy_set_header {name} {value};")?;
        }
        writeln!(out, "    }}")?;
        writeln!(out, "}}")
    }
}
