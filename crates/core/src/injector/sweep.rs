//! Cookie-scope sweep.
//!
//! A cookie can only be deleted from script by re-setting it with the exact
//! domain and path it was created with, and the page cannot read those back.
//! The sweep expires every cookie name in every plausible scope: each
//! domain-label suffix of the host, most specific first, crossed with each
//! path prefix, deepest first.

use handoff_protocol::expire_directive;

/// Domain-label suffixes of `host`, from the full host down to the last label.
///
/// `m.snappfood.ir` yields `m.snappfood.ir`, `snappfood.ir`, `ir`.
pub fn domain_suffixes(host: &str) -> Vec<String> {
	let labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();
	(0..labels.len()).map(|i| labels[i..].join(".")).collect()
}

/// Path prefixes of `path`, from the full path down to `/`.
///
/// `/a/b` yields `/a/b`, `/a`, `/`.
pub fn path_prefixes(path: &str) -> Vec<String> {
	let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
	let mut prefixes: Vec<String> = (1..=segments.len())
		.rev()
		.map(|n| format!("/{}", segments[..n].join("/")))
		.collect();
	prefixes.push("/".to_string());
	prefixes
}

/// Parent domain of `domain`, when it has more than two labels.
pub fn parent_domain(domain: &str) -> Option<String> {
	let labels: Vec<&str> = domain.split('.').filter(|l| !l.is_empty()).collect();
	(labels.len() > 2).then(|| labels[1..].join("."))
}

/// Builds the expiry directives for every `(name, domain, path)` combination.
///
/// Domains are the suffixes of `host` followed by any suffix of `scopes` not
/// already covered, so the target domain and its parent are swept even when
/// the page ended up on another host.
pub fn plan(names: &[String], host: &str, path: &str, scopes: &[&str]) -> Vec<String> {
	if names.is_empty() {
		return Vec::new();
	}

	let mut domains = domain_suffixes(host);
	for scope in scopes {
		for suffix in domain_suffixes(scope) {
			if !domains.contains(&suffix) {
				domains.push(suffix);
			}
		}
	}
	let paths = path_prefixes(path);

	let mut directives = Vec::with_capacity(names.len() * domains.len() * paths.len());
	for name in names {
		for domain in &domains {
			for path in &paths {
				directives.push(expire_directive(name, domain, path));
			}
		}
	}
	directives
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn domain_suffixes_go_from_specific_to_root() {
		assert_eq!(domain_suffixes("m.snappfood.ir"), vec!["m.snappfood.ir", "snappfood.ir", "ir"]);
		assert_eq!(domain_suffixes("localhost"), vec!["localhost"]);
		assert!(domain_suffixes("").is_empty());
	}

	#[test]
	fn path_prefixes_go_from_deepest_to_root() {
		assert_eq!(path_prefixes("/a/b/"), vec!["/a/b", "/a", "/"]);
		assert_eq!(path_prefixes("/"), vec!["/"]);
		assert_eq!(path_prefixes(""), vec!["/"]);
	}

	#[test]
	fn parent_domain_drops_first_label() {
		assert_eq!(parent_domain("m.snappfood.ir").as_deref(), Some("snappfood.ir"));
		assert_eq!(parent_domain("snappfood.ir"), None);
	}

	#[test]
	fn plan_crosses_names_domains_and_paths_in_order() {
		let names = vec!["sid".to_string()];
		let plan = plan(&names, "m.snappfood.ir", "/menu", &["m.snappfood.ir", "snappfood.ir"]);

		assert_eq!(plan.len(), 3 * 2);
		assert_eq!(plan[0], "sid=; expires=Thu, 01 Jan 1970 00:00:00 GMT; domain=m.snappfood.ir; path=/menu");
		assert_eq!(plan[1], "sid=; expires=Thu, 01 Jan 1970 00:00:00 GMT; domain=m.snappfood.ir; path=/");
		assert!(plan[5].ends_with("domain=ir; path=/"));
	}

	#[test]
	fn plan_adds_scopes_missing_from_live_host() {
		let names = vec!["a".to_string()];
		let plan = plan(&names, "login.other.ir", "/", &["m.snappfood.ir", "snappfood.ir"]);
		let domains: Vec<&str> = plan
			.iter()
			.map(|d| d.split("domain=").nth(1).unwrap().split(';').next().unwrap())
			.collect();
		assert_eq!(domains, vec!["login.other.ir", "other.ir", "ir", "m.snappfood.ir", "snappfood.ir"]);
	}

	#[test]
	fn plan_is_empty_without_cookies() {
		assert!(plan(&[], "m.snappfood.ir", "/", &[]).is_empty());
	}
}
