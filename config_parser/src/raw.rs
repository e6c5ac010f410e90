use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DeserializeFromStr, DisplayFromStr, PickFirst, SerializeDisplay};

/// Largest body the server buffers when the config doesn't say otherwise, GitHub caps webhook
/// payloads at 25 MB.
pub const DEFAULT_MAX_BODY_SIZE: u64 = 25 << 20;

#[derive(Debug, PartialEq, Eq)]
enum Variable<'a> {
    Env(&'a str),
}

trait ReplaceVariables {
    const VARIABLE_PREFIX: &'static str = "${{";
    const VARIABLE_SUFFIX: &'static str = "}}";

    fn get_inner(value: &str) -> Result<Option<Variable<'_>>> {
        let Some(inner) = value
            .trim()
            .strip_prefix(Self::VARIABLE_PREFIX)
            .and_then(|item| item.strip_suffix(Self::VARIABLE_SUFFIX))
            .map(|item| item.trim())
        else {
            return Ok(None);
        };

        match inner.strip_prefix("env.") {
            Some(env_key) if !env_key.is_empty() => Ok(Some(Variable::Env(env_key))),
            _ => bail!("Unknown variable: '{}'", inner),
        }
    }

    fn resolve(value: &mut String) -> Result<()> {
        if let Some(variable) = Self::get_inner(value)? {
            let replace_with = match variable {
                Variable::Env(env_key) => std::env::var(env_key).with_context(|| {
                    format!(
                        "Could not find an environment variable with the name: '{}'",
                        env_key
                    )
                })?,
            };

            *value = replace_with;
        }

        Ok(())
    }

    fn replace(&mut self) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq, SerializeDisplay, DeserializeFromStr)]
pub enum ConfigVersion {
    V1_0Beta,
}

impl Display for ConfigVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigVersion::V1_0Beta => write!(f, "1.0-beta"),
        }
    }
}

impl FromStr for ConfigVersion {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::prelude::v1::Result<Self, Self::Err> {
        match s {
            "1.0-beta" => Ok(ConfigVersion::V1_0Beta),
            _ => bail!("Unknown version: {}", s),
        }
    }
}

fn default_max_body_size() -> u64 {
    DEFAULT_MAX_BODY_SIZE
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub expose: u16,
    #[serde(default = "default_max_body_size")]
    pub max_body_size: u64,
}

/// A pipeline step, written either as a mapping or as a one line directive like
/// `validate_github ${{ env.GITHUB_WEBHOOK_SECRET }}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Step {
    pub uses: String,
    pub name: Option<String>,
    /// Positional arguments, only filled by the directive form.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(default)]
    pub arguments: HashMap<String, String>,
}

impl Step {
    /// Merges the positional arguments into the named ones, `names` giving the name of each
    /// position.
    pub fn named_arguments(&self, names: &[&str]) -> Result<HashMap<String, String>> {
        if self.args.len() > names.len() {
            bail!(
                "'{}' takes at most {} argument(s), got {}",
                self.uses,
                names.len(),
                self.args.len()
            );
        }

        let mut arguments = self.arguments.clone();
        for (name, value) in names.iter().zip(&self.args) {
            if arguments.insert(name.to_string(), value.clone()).is_some() {
                bail!("'{}': argument '{}' given twice", self.uses, name);
            }
        }

        Ok(arguments)
    }
}

/// Splits a directive into tokens on whitespace. Double quoted strings and `${{ ... }}` variables
/// are kept as one token.
fn tokenize(line: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut rest = line.trim_start();

    while !rest.is_empty() {
        let (token, tail) = if let Some(quoted) = rest.strip_prefix('"') {
            let end = quoted
                .find('"')
                .with_context(|| format!("Unterminated quote in '{}'", line))?;

            (&quoted[..end], &quoted[end + 1..])
        } else if rest.starts_with(<Step as ReplaceVariables>::VARIABLE_PREFIX) {
            let end = rest
                .find(<Step as ReplaceVariables>::VARIABLE_SUFFIX)
                .with_context(|| format!("Unterminated variable in '{}'", line))?
                + <Step as ReplaceVariables>::VARIABLE_SUFFIX.len();

            (&rest[..end], &rest[end..])
        } else {
            let end = rest.find(char::is_whitespace).unwrap_or(rest.len());

            (&rest[..end], &rest[end..])
        };

        tokens.push(token.to_string());
        rest = tail.trim_start();
    }

    Ok(tokens)
}

impl FromStr for Step {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::prelude::v1::Result<Self, Self::Err> {
        let mut tokens = tokenize(s)?.into_iter();

        let Some(uses) = tokens.next() else {
            bail!("Empty pipeline directive");
        };

        Ok(Step {
            uses,
            name: None,
            args: tokens.collect(),
            arguments: HashMap::new(),
        })
    }
}

impl ReplaceVariables for Step {
    fn replace(&mut self) -> Result<()> {
        if Self::get_inner(&self.uses)?.is_some() {
            bail!("Variables are not allowed in 'uses': '{}'", self.uses);
        }

        for argument in self.args.iter_mut().chain(self.arguments.values_mut()) {
            Self::resolve(argument).with_context(|| format!("In step '{}'", self.uses))?;
        }

        Ok(())
    }
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub path: String,
    #[serde_as(as = "Vec<PickFirst<(_, DisplayFromStr)>>")]
    pub pipeline: Vec<Step>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    pub version: ConfigVersion,
    pub config: Config,
    pub route: Route,
}

impl ConfigFile {
    pub fn parse(path: impl AsRef<Path>) -> Result<ConfigFile> {
        let path = path.as_ref();
        let config_file = std::fs::File::open(path)
            .with_context(|| format!("Could not open the config file '{}'", path.display()))?;

        Self::parse_from_reader(config_file)
    }

    pub fn parse_from_reader<R: std::io::Read>(reader: R) -> Result<ConfigFile> {
        let config = serde_yaml::from_reader(reader)?;

        Ok(config)
    }

    /// Replaces every `${{ env.NAME }}` argument with the value of the environment variable.
    pub fn populate_env_variables(&mut self) -> Result<()> {
        for step in self.route.pipeline.iter_mut() {
            step.replace()?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_with_one_argument() {
        let step: Step = "validate_github blah".parse().unwrap();

        assert_eq!(step.uses, "validate_github");
        assert_eq!(step.args, vec!["blah".to_string()]);
        assert!(step.arguments.is_empty());
    }

    #[test]
    fn directive_keeps_variables_and_quotes_together() {
        let step: Step = r#"validate_github ${{ env.GITHUB_WEBHOOK_SECRET }}"#.parse().unwrap();
        assert_eq!(step.args, vec!["${{ env.GITHUB_WEBHOOK_SECRET }}".to_string()]);

        let step: Step = r#"validate_github "with some spaces""#.parse().unwrap();
        assert_eq!(step.args, vec!["with some spaces".to_string()]);
    }

    #[test]
    fn broken_directives() {
        assert!("".parse::<Step>().is_err());
        assert!("   ".parse::<Step>().is_err());
        assert!(r#"validate_github "unterminated"#.parse::<Step>().is_err());
        assert!("validate_github ${{ env.NOPE".parse::<Step>().is_err());
    }

    #[test]
    fn named_arguments_merge_positional_ones() {
        let step: Step = "validate_github blah".parse().unwrap();

        let arguments = step.named_arguments(&["secret"]).unwrap();
        assert_eq!(arguments.get("secret").map(String::as_str), Some("blah"));
    }

    #[test]
    fn too_many_positional_arguments() {
        let step: Step = "validate_github blah blubb".parse().unwrap();

        assert!(step.named_arguments(&["secret"]).is_err());
    }

    #[test]
    fn argument_given_twice() {
        let mut step: Step = "validate_github blah".parse().unwrap();
        step.arguments
            .insert("secret".to_string(), "blubb".to_string());

        assert!(step.named_arguments(&["secret"]).is_err());
    }

    #[test]
    fn variables_are_replaced_from_the_environment() {
        std::env::set_var("CONFIG_PARSER_TEST_SECRET", "from-env");
        let mut step: Step = "validate_github ${{ env.CONFIG_PARSER_TEST_SECRET }}"
            .parse()
            .unwrap();

        step.replace().unwrap();

        assert_eq!(step.args, vec!["from-env".to_string()]);
    }

    #[test]
    fn missing_and_unknown_variables_fail() {
        let mut step: Step = "validate_github ${{ env.CONFIG_PARSER_TEST_UNSET }}"
            .parse()
            .unwrap();
        assert!(step.replace().is_err());

        let mut step: Step = "validate_github ${{ secrets.FOO }}".parse().unwrap();
        assert!(step.replace().is_err());
    }

    #[test]
    fn plain_values_are_left_alone() {
        let mut step: Step = "validate_github blah".parse().unwrap();

        step.replace().unwrap();

        assert_eq!(step.args, vec!["blah".to_string()]);
    }

    #[test]
    fn unknown_version() {
        assert!("2.0".parse::<ConfigVersion>().is_err());
        assert_eq!(
            "1.0-beta".parse::<ConfigVersion>().unwrap(),
            ConfigVersion::V1_0Beta
        );
    }

    #[test]
    fn both_step_forms_in_one_pipeline() {
        let config = ConfigFile::parse_from_reader(
            r#"
version: 1.0-beta
config:
  expose: 3000
route:
  path: /github
  pipeline:
    - validate_github blah
    - uses: validate_github
      name: Second opinion
      arguments:
        secret: blubb
"#
            .as_bytes(),
        )
        .unwrap();

        assert_eq!(config.config.max_body_size, DEFAULT_MAX_BODY_SIZE);
        assert_eq!(config.route.pipeline.len(), 2);
        assert_eq!(config.route.pipeline[0].args, vec!["blah".to_string()]);
        assert_eq!(
            config.route.pipeline[1].name.as_deref(),
            Some("Second opinion")
        );
        assert_eq!(
            config.route.pipeline[1]
                .arguments
                .get("secret")
                .map(String::as_str),
            Some("blubb")
        );
    }

    #[test]
    fn unknown_step_keys_are_an_error() {
        let result = ConfigFile::parse_from_reader(
            r#"
version: 1.0-beta
config:
  expose: 3000
route:
  path: /github
  pipeline:
    - uses: validate_github
      with:
        secret: blubb
"#
            .as_bytes(),
        );

        assert!(result.is_err());
    }
}
