use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::Context as _;
use playload_core::runner::{DEFAULT_SCENARIO_NAME, ScenarioOptions, ScriptOptions};
use playload_core::{
    Check, CheckKind, DEFAULT_BASE_URL, DEFAULT_PATH, DEFAULT_REQUEST_TIMEOUT, DEFAULT_SLEEP,
    PlayScenario, RequestTemplate,
};
use serde::Deserialize;

/// Scenario file. Top-level fields are defaults for every entry in `scenarios`; without
/// `scenarios` the top level describes the single scenario.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ScenarioFile {
    pub name: Option<String>,

    #[serde(default, deserialize_with = "deserialize_tags")]
    pub tags: BTreeMap<String, String>,

    pub vus: Option<u64>,
    pub iterations: Option<u64>,
    pub duration: Option<YamlDuration>,
    pub graceful_stop: Option<YamlDuration>,

    pub request: Option<RequestYaml>,
    pub checks: Option<Vec<CheckYaml>>,
    /// Think time after each request.
    pub sleep: Option<YamlDuration>,

    #[serde(default)]
    pub scenarios: Vec<ScenarioFile>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RequestYaml {
    pub method: Option<String>,
    pub base_url: Option<String>,
    pub path: Option<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
    pub timeout: Option<YamlDuration>,
}

impl RequestYaml {
    /// Field-wise merge; `self` wins.
    fn or(self, fallback: Option<&RequestYaml>) -> Self {
        let Some(fb) = fallback else {
            return self;
        };

        let mut headers = fb.headers.clone();
        headers.extend(self.headers);

        Self {
            method: self.method.or_else(|| fb.method.clone()),
            base_url: self.base_url.or_else(|| fb.base_url.clone()),
            path: self.path.or_else(|| fb.path.clone()),
            headers,
            body: self.body.or_else(|| fb.body.clone()),
            timeout: self.timeout.or(fb.timeout),
        }
    }
}

/// One check. Exactly one of `status` / `body_contains` must be set.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct CheckYaml {
    pub name: Option<String>,
    pub status: Option<u16>,
    pub body_contains: Option<String>,
}

impl CheckYaml {
    fn to_check(&self) -> anyhow::Result<Check> {
        let kind = match (self.status, &self.body_contains) {
            (Some(code), None) => CheckKind::Status(code),
            (None, Some(needle)) => CheckKind::BodyContains(needle.clone()),
            _ => anyhow::bail!("a check needs exactly one of `status` or `body_contains`"),
        };

        let name = match (&self.name, &kind) {
            (Some(name), _) => name.clone(),
            (None, CheckKind::Status(code)) => format!("status is {code}"),
            (None, CheckKind::BodyContains(needle)) => format!("body contains {needle}"),
        };

        Ok(Check::new(name, kind))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct YamlDuration(Duration);

impl YamlDuration {
    pub(crate) fn into_inner(self) -> Duration {
        self.0
    }
}

impl<'de> Deserialize<'de> for YamlDuration {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct V;

        impl serde::de::Visitor<'_> for V {
            type Value = YamlDuration;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("duration as string (e.g. 30s), integer seconds, or float seconds")
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(YamlDuration(Duration::from_secs(v)))
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                u64::try_from(v)
                    .map(|v| YamlDuration(Duration::from_secs(v)))
                    .map_err(|_| E::custom("duration must not be negative"))
            }

            fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                if !v.is_finite() || v < 0.0 {
                    return Err(E::custom("duration must be a non-negative, finite number"));
                }
                Ok(YamlDuration(Duration::from_secs_f64(v)))
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                crate::cli::parse_duration(v)
                    .map(YamlDuration)
                    .map_err(E::custom)
            }
        }

        deserializer.deserialize_any(V)
    }
}

fn deserialize_tags<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = BTreeMap::<String, serde_yaml::Value>::deserialize(deserializer)?;
    let mut out = BTreeMap::new();

    for (k, v) in raw {
        let s = match v {
            serde_yaml::Value::Null => continue,
            serde_yaml::Value::Bool(b) => b.to_string(),
            serde_yaml::Value::Number(n) => n.to_string(),
            serde_yaml::Value::String(s) => s,
            _ => continue,
        };
        out.insert(k, s);
    }

    Ok(out)
}

pub(crate) async fn load(path: &Path) -> anyhow::Result<ScenarioFile> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read scenario file: {}", path.display()))?;

    parse(&bytes).with_context(|| format!("failed to parse scenario file: {}", path.display()))
}

fn parse(bytes: &[u8]) -> anyhow::Result<ScenarioFile> {
    // An empty document is a valid "all defaults" file.
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(ScenarioFile::default());
    }
    Ok(serde_yaml::from_slice(bytes)?)
}

/// Values applied on top of the file (CLI flags / environment).
#[derive(Debug, Clone, Default)]
pub(crate) struct Overrides {
    pub base_url: Option<String>,
    pub category: Option<String>,
}

/// Everything the runner needs: run-shape options and one play scenario per entry, same order.
#[derive(Debug)]
pub(crate) struct LoadPlan {
    pub options: ScriptOptions,
    pub scenarios: Vec<PlayScenario>,
}

impl ScenarioFile {
    pub(crate) fn into_plan(mut self, overrides: &Overrides) -> anyhow::Result<LoadPlan> {
        let entries = if self.scenarios.is_empty() {
            vec![ScenarioFile {
                name: self.name.clone(),
                ..ScenarioFile::default()
            }]
        } else {
            std::mem::take(&mut self.scenarios)
        };
        let defaults = self;

        let mut options = ScriptOptions {
            vus: defaults.vus,
            iterations: defaults.iterations,
            duration: defaults.duration.map(YamlDuration::into_inner),
            graceful_stop: defaults.graceful_stop.map(YamlDuration::into_inner),
            scenarios: Vec::with_capacity(entries.len()),
        };
        let mut plays = Vec::with_capacity(entries.len());

        for entry in entries {
            let name = entry
                .name
                .clone()
                .unwrap_or_else(|| DEFAULT_SCENARIO_NAME.to_string());

            if !entry.scenarios.is_empty() {
                anyhow::bail!("scenario `{name}` cannot contain nested `scenarios`");
            }

            let play = build_play(&entry, &defaults, overrides)
                .with_context(|| format!("invalid scenario `{name}`"))?;

            let mut tags = defaults.tags.clone();
            tags.extend(entry.tags);
            if let Some(category) = &overrides.category {
                tags.insert(crate::run::CATEGORY_TAG.to_string(), category.clone());
            }

            options.scenarios.push(ScenarioOptions {
                name,
                tags: tags.into_iter().collect(),
                vus: entry.vus,
                iterations: entry.iterations,
                duration: entry.duration.map(YamlDuration::into_inner),
                graceful_stop: entry.graceful_stop.map(YamlDuration::into_inner),
            });
            plays.push(play);
        }

        Ok(LoadPlan {
            options,
            scenarios: plays,
        })
    }
}

fn build_play(
    entry: &ScenarioFile,
    defaults: &ScenarioFile,
    overrides: &Overrides,
) -> anyhow::Result<PlayScenario> {
    let req = entry
        .request
        .clone()
        .unwrap_or_default()
        .or(defaults.request.as_ref());

    let base_url = overrides
        .base_url
        .as_deref()
        .or(req.base_url.as_deref())
        .unwrap_or(DEFAULT_BASE_URL);
    let path = req.path.as_deref().unwrap_or(DEFAULT_PATH);

    let mut request = RequestTemplate::post(base_url, path)?.with_timeout(
        req.timeout
            .map(YamlDuration::into_inner)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT),
    );
    if let Some(method) = &req.method {
        request = request.with_method(method)?;
    }
    for (k, v) in &req.headers {
        request = request.with_header(k, v)?;
    }
    if let Some(body) = req.body {
        request = request.with_body(body);
    }

    let checks = match entry.checks.as_ref().or(defaults.checks.as_ref()) {
        Some(list) => list
            .iter()
            .map(CheckYaml::to_check)
            .collect::<anyhow::Result<Vec<_>>>()?,
        None => vec![Check::default()],
    };

    let sleep = entry
        .sleep
        .or(defaults.sleep)
        .map(YamlDuration::into_inner)
        .unwrap_or(DEFAULT_SLEEP);

    Ok(PlayScenario {
        request,
        checks,
        sleep,
    })
}
