use anyhow::{Result, anyhow};
use serde::Deserialize;
use url::Url;

pub const REDDIT_BASE: &str = "https://www.reddit.com";
pub const DEFAULT_CLIENT_ID: &str = "ViralContentAutomation/1.0";

/// One listing query against the discussion site: a set of channels merged into a
/// single `hot.json` request.
///
/// Fields are private so a config can't change after construction; everything the
/// fetcher needs is derived through the accessors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    name: String,
    sources: Vec<String>,
    limit: u32,
    minimum_score: u64,
    client_id: String,
    base: Url,
}

impl SourceConfig {
    pub fn new(
        name: impl Into<String>,
        sources: Vec<String>,
        limit: u32,
        minimum_score: u64,
        client_id: impl Into<String>,
    ) -> Result<Self> {
        let base = Url::parse(REDDIT_BASE)?;
        Self::with_base(name, sources, limit, minimum_score, client_id, base)
    }

    pub fn with_base(
        name: impl Into<String>,
        sources: Vec<String>,
        limit: u32,
        minimum_score: u64,
        client_id: impl Into<String>,
        base: Url,
    ) -> Result<Self> {
        let name = name.into();
        if sources.is_empty() {
            return Err(anyhow!("source `{}` has no channels", name));
        }
        if let Some(bad) = sources.iter().find(|s| !is_valid_channel(s)) {
            return Err(anyhow!("source `{}` has an invalid channel name `{}`", name, bad));
        }
        if limit == 0 {
            return Err(anyhow!("source `{}` needs a limit above zero", name));
        }
        if base.cannot_be_a_base() {
            return Err(anyhow!("source `{}` has an unusable base URL: {}", name, base));
        }

        Ok(Self {
            name,
            sources,
            limit,
            minimum_score,
            client_id: client_id.into(),
            base,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn minimum_score(&self) -> u64 {
        self.minimum_score
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// `<base>/r/<chan1>+<chan2>/hot.json`
    pub fn endpoint_url(&self) -> Result<Url> {
        let path = format!("r/{}/hot.json", self.sources.join("+"));
        Ok(self.base.join(&path)?)
    }

    /// Host of the discussion pages, lowercased and without a leading `www.`.
    pub fn discussion_host(&self) -> String {
        let host = self.base.host_str().unwrap_or_default().to_ascii_lowercase();
        match host.strip_prefix("www.") {
            Some(stripped) => stripped.to_string(),
            None => host,
        }
    }

    pub fn with_minimum_score(&self, minimum_score: u64) -> Self {
        Self {
            minimum_score,
            ..self.clone()
        }
    }
}

/// Channel names are ASCII letters, digits and underscores.
fn is_valid_channel(channel: &str) -> bool {
    !channel.is_empty() && channel.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// A user-defined source from the YAML config.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomSource {
    pub name: String,
    pub channels: Vec<String>,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default = "default_minimum_score")]
    pub minimum_score: u64,
}

fn default_limit() -> u32 {
    25
}

fn default_minimum_score() -> u64 {
    100
}

impl CustomSource {
    pub fn to_source_config(&self, client_id: &str) -> Result<SourceConfig> {
        SourceConfig::new(
            self.name.clone(),
            self.channels.clone(),
            self.limit,
            self.minimum_score,
            client_id,
        )
    }
}

struct Preset {
    name: &'static str,
    channels: &'static [&'static str],
    limit: u32,
    minimum_score: u64,
}

const PRESETS: &[Preset] = &[
    Preset {
        name: "entertainment",
        channels: &["entertainment", "movies", "television", "Music", "popculture"],
        limit: 30,
        minimum_score: 500,
    },
    Preset {
        name: "food",
        channels: &["food", "FoodPorn", "Cooking", "recipes", "EatCheapAndHealthy"],
        limit: 30,
        minimum_score: 500,
    },
    Preset {
        name: "gaming",
        channels: &["gaming", "Games", "pcgaming", "PS5", "xbox"],
        limit: 30,
        minimum_score: 500,
    },
    Preset {
        name: "lifestyle",
        channels: &["BeautyGuruChatter", "MakeupAddiction", "SkincareAddiction", "fashion", "streetwear"],
        limit: 30,
        minimum_score: 500,
    },
    Preset {
        name: "hobbies",
        channels: &["DIY", "crafts", "Art", "photography", "gardening"],
        limit: 30,
        minimum_score: 500,
    },
    Preset {
        name: "sports",
        channels: &["sports", "nba", "nfl", "soccer", "fitness"],
        limit: 30,
        minimum_score: 500,
    },
    Preset {
        name: "all",
        channels: &["videos", "gifs", "Damnthatsinteresting", "interestingasfuck", "oddlysatisfying", "nextfuckinglevel"],
        limit: 50,
        minimum_score: 1000,
    },
    Preset {
        name: "news",
        channels: &["news", "worldnews", "UpliftingNews", "nottheonion", "technology", "science"],
        limit: 50,
        minimum_score: 500,
    },
];

pub fn preset_names() -> Vec<&'static str> {
    PRESETS.iter().map(|p| p.name).collect()
}

pub fn preset(name: &str, client_id: &str) -> Result<SourceConfig> {
    let found = PRESETS
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| {
            anyhow!(
                "Unknown preset `{}`. Available: {}",
                name,
                preset_names().join(", ")
            )
        })?;

    SourceConfig::new(
        found.name,
        found.channels.iter().map(|c| c.to_string()).collect(),
        found.limit,
        found.minimum_score,
        client_id,
    )
}

/// Turn CLI source names into configs. Custom sources shadow presets of the same name.
pub fn resolve_sources(
    names: &[String],
    custom: &[CustomSource],
    client_id: &str,
    minimum_score: Option<u64>,
) -> Result<Vec<SourceConfig>> {
    let mut configs = Vec::with_capacity(names.len());

    for name in names {
        let config = match custom.iter().find(|c| c.name.eq_ignore_ascii_case(name)) {
            Some(custom) => custom.to_source_config(client_id)?,
            None => preset(name, client_id)?,
        };
        configs.push(match minimum_score {
            Some(score) => config.with_minimum_score(score),
            None => config,
        });
    }

    Ok(configs)
}

/// One line per preset for `--list-presets`.
pub fn describe_presets() -> String {
    PRESETS
        .iter()
        .map(|p| {
            format!(
                "{:<14} limit {:<3} min score {:<5} r/{}",
                p.name,
                p.limit,
                p.minimum_score,
                p.channels.join("+")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
