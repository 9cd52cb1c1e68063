//! Configuration for the connection resolver.

use crate::parent::StorageTarget;
use clap::Args;

/// Connection resolver options.
///
/// These can be embedded in a command line interface with `#[clap(flatten)]`.
#[derive(Clone, Debug, PartialEq, Eq, Args)]
pub struct ResolverOptions {
    /// The GraphQL schema uses camelCase field names.
    ///
    /// When set, field names selected by a query are converted to snake_case to obtain the
    /// corresponding column names.
    #[clap(long, env = "RELAY_CAMEL_CASE")]
    pub camel_case: bool,

    /// Relations whose records are stored in the history store rather than the primary store.
    #[clap(
        long = "history-relation",
        env = "RELAY_HISTORY_RELATIONS",
        value_delimiter = ',',
        default_value = "histories"
    )]
    pub history_relations: Vec<String>,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            camel_case: false,
            history_relations: vec!["histories".into()],
        }
    }
}

impl ResolverOptions {
    /// The store from which the relation `name` is loaded.
    pub fn storage_target(&self, name: &str) -> StorageTarget {
        if self.history_relations.iter().any(|relation| relation == name) {
            StorageTarget::History
        } else {
            StorageTarget::Primary
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use clap::Parser;

    #[derive(Debug, Parser)]
    struct Cli {
        #[clap(flatten)]
        options: ResolverOptions,
    }

    #[test]
    fn test_default_options() {
        let cli = Cli::try_parse_from(["test"]).unwrap();
        assert_eq!(cli.options, ResolverOptions::default());
        assert_eq!(
            cli.options.storage_target("histories"),
            StorageTarget::History
        );
        assert_eq!(
            cli.options.storage_target("comments"),
            StorageTarget::Primary
        );
    }

    #[test]
    fn test_parse_options() {
        let cli = Cli::try_parse_from([
            "test",
            "--camel-case",
            "--history-relation",
            "revisions,audits",
        ])
        .unwrap();
        assert!(cli.options.camel_case);
        assert_eq!(cli.options.history_relations, ["revisions", "audits"]);
        assert_eq!(
            cli.options.storage_target("histories"),
            StorageTarget::Primary
        );
        assert_eq!(cli.options.storage_target("audits"), StorageTarget::History);
    }
}
