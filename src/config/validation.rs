use crate::config::types::{
    Config, DiscoveryMode, ExtractConfig, ExtractStep, HttpMethod, IdentityConfig, OutputConfig,
    PaginationKind, PaginationRule, PayloadFormat, SourceConfig,
};
use crate::ConfigError;
use regex::Regex;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_source(&config.source)?;
    validate_extract(&config.extract, config.source.discovery)?;
    validate_identity(&config.identity, &config.extract)?;
    validate_output(&config.output, &config.extract)?;
    Ok(())
}

/// Validates source endpoint and pagination limits
fn validate_source(source: &SourceConfig) -> Result<(), ConfigError> {
    if source.name.is_empty() {
        return Err(ConfigError::Validation(
            "source name cannot be empty".to_string(),
        ));
    }

    if source.concurrency < 1 || source.concurrency > 100 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 100, got {}",
            source.concurrency
        )));
    }

    if source.page_size < 1 {
        return Err(ConfigError::Validation(format!(
            "page-size must be >= 1, got {}",
            source.page_size
        )));
    }

    if source.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max-pages must be >= 1, got {}",
            source.max_pages
        )));
    }

    if source.request_timeout < 1 {
        return Err(ConfigError::Validation(format!(
            "request-timeout must be >= 1 second, got {}",
            source.request_timeout
        )));
    }

    if source.body.is_some() && source.method == HttpMethod::Get {
        return Err(ConfigError::Validation(
            "body is only valid when method = \"post\"".to_string(),
        ));
    }

    if !source.has_page_placeholder() {
        return Err(ConfigError::Validation(
            "endpoint or body must contain a {page} or {offset} placeholder".to_string(),
        ));
    }

    // Render the template for page 1 and make sure the result is a real URL
    let rendered = source.page_url(1, 0);
    let url = Url::parse(&rendered)
        .map_err(|e| ConfigError::InvalidUrl(format!("'{}': {}", rendered, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "endpoint must use http or https, got '{}'",
            url.scheme()
        )));
    }

    for (name, value) in &source.headers {
        if name.is_empty() || value.is_empty() {
            return Err(ConfigError::Validation(
                "header names and values cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates extraction rules against the declared payload format
fn validate_extract(extract: &ExtractConfig, discovery: DiscoveryMode) -> Result<(), ConfigError> {
    match extract.format {
        PayloadFormat::Html => {
            require_selector(extract.record_selector.as_deref(), "record-selector")?;
        }
        PayloadFormat::Json => {
            require_path(extract.records_path.as_deref(), "records-path")?;
        }
        PayloadFormat::JsonHtml => {
            require_path(extract.fragment_path.as_deref(), "fragment-path")?;
            require_selector(extract.record_selector.as_deref(), "record-selector")?;
        }
    }

    if extract.fields.is_empty() {
        return Err(ConfigError::Validation(
            "at least one [[extract.field]] rule is required".to_string(),
        ));
    }

    for field in &extract.fields {
        if field.name.is_empty() {
            return Err(ConfigError::Validation(
                "field name cannot be empty".to_string(),
            ));
        }

        if field.steps.is_empty() {
            return Err(ConfigError::Validation(format!(
                "field '{}' must have at least one step",
                field.name
            )));
        }

        for step in &field.steps {
            validate_step(step, &field.name, extract.format)?;
        }
    }

    validate_pagination(&extract.pagination, extract.format, discovery)?;

    Ok(())
}

/// Validates one extraction step for the payload format it will run against
fn validate_step(
    step: &ExtractStep,
    field: &str,
    format: PayloadFormat,
) -> Result<(), ConfigError> {
    match format {
        // Fields come from JSON values; every step needs a path
        PayloadFormat::Json => {
            if step.path.is_none() {
                return Err(ConfigError::Validation(format!(
                    "field '{}': json steps require a path",
                    field
                )));
            }
            if step.selector.is_some() || step.attr.is_some() {
                return Err(ConfigError::Validation(format!(
                    "field '{}': selector and attr do not apply to json steps",
                    field
                )));
            }
        }
        // Fields come from record elements; paths do not apply
        PayloadFormat::Html | PayloadFormat::JsonHtml => {
            if step.path.is_some() {
                return Err(ConfigError::Validation(format!(
                    "field '{}': path only applies to json sources",
                    field
                )));
            }
            if let Some(selector) = step.selector.as_deref() {
                check_selector(selector)?;
            }
        }
    }

    if let Some(pattern) = step.pattern.as_deref() {
        check_pattern(pattern)?;
    }

    Ok(())
}

/// Validates the continuation rule against format and discovery mode
fn validate_pagination(
    rule: &PaginationRule,
    format: PayloadFormat,
    discovery: DiscoveryMode,
) -> Result<(), ConfigError> {
    match discovery {
        DiscoveryMode::KnownTotal => {
            if !matches!(
                rule.rule,
                PaginationKind::PageLinks | PaginationKind::TotalField
            ) {
                return Err(ConfigError::Validation(
                    "known-total discovery requires a page-links or total-field rule".to_string(),
                ));
            }
        }
        DiscoveryMode::Sentinel => {
            if !matches!(
                rule.rule,
                PaginationKind::MoreMarker | PaginationKind::NonEmpty
            ) {
                return Err(ConfigError::Validation(
                    "sentinel discovery requires a more-marker or non-empty rule".to_string(),
                ));
            }
        }
    }

    match rule.rule {
        PaginationKind::PageLinks => {
            require_selector(rule.selector.as_deref(), "pagination selector")?;
            match rule.pattern.as_deref() {
                Some(pattern) => check_pattern(pattern)?,
                None => {
                    return Err(ConfigError::Validation(
                        "page-links rule requires a pattern capturing the page number"
                            .to_string(),
                    ))
                }
            }
        }
        PaginationKind::TotalField => match format {
            PayloadFormat::Html => {
                require_selector(rule.selector.as_deref(), "pagination selector")?;
                match rule.pattern.as_deref() {
                    Some(pattern) => check_pattern(pattern)?,
                    None => {
                        return Err(ConfigError::Validation(
                            "total-field rule on html requires a pattern capturing the total"
                                .to_string(),
                        ))
                    }
                }
            }
            PayloadFormat::Json | PayloadFormat::JsonHtml => {
                require_path(rule.path.as_deref(), "pagination path")?;
                if let Some(pattern) = rule.pattern.as_deref() {
                    check_pattern(pattern)?;
                }
            }
        },
        PaginationKind::MoreMarker => match format {
            PayloadFormat::Html => {
                require_selector(rule.selector.as_deref(), "pagination selector")?;
                if let Some(pattern) = rule.pattern.as_deref() {
                    check_pattern(pattern)?;
                }
            }
            PayloadFormat::Json | PayloadFormat::JsonHtml => {
                require_path(rule.path.as_deref(), "pagination path")?;
                if let Some(pattern) = rule.pattern.as_deref() {
                    check_pattern(pattern)?;
                }
            }
        },
        PaginationKind::NonEmpty => {}
    }

    Ok(())
}

/// Validates that identity keys refer to extracted fields
fn validate_identity(identity: &IdentityConfig, extract: &ExtractConfig) -> Result<(), ConfigError> {
    if identity.key_fields.is_empty() {
        return Err(ConfigError::Validation(
            "identity key-fields cannot be empty".to_string(),
        ));
    }

    for key in &identity.key_fields {
        if !extract.fields.iter().any(|field| &field.name == key) {
            return Err(ConfigError::Validation(format!(
                "identity key '{}' does not match any extracted field",
                key
            )));
        }
    }

    Ok(())
}

/// Validates output path and column references
fn validate_output(output: &OutputConfig, extract: &ExtractConfig) -> Result<(), ConfigError> {
    if output.path.is_empty() {
        return Err(ConfigError::Validation(
            "output path cannot be empty".to_string(),
        ));
    }

    if output.columns.is_empty() {
        return Err(ConfigError::Validation(
            "output columns cannot be empty".to_string(),
        ));
    }

    for column in &output.columns {
        if !extract.fields.iter().any(|field| &field.name == column) {
            return Err(ConfigError::Validation(format!(
                "output column '{}' does not match any extracted field",
                column
            )));
        }
    }

    Ok(())
}

fn require_selector(selector: Option<&str>, what: &str) -> Result<(), ConfigError> {
    match selector {
        Some(selector) => check_selector(selector),
        None => Err(ConfigError::Validation(format!("{} is required", what))),
    }
}

fn require_path(path: Option<&str>, what: &str) -> Result<(), ConfigError> {
    match path {
        Some(path) if !path.is_empty() => Ok(()),
        _ => Err(ConfigError::Validation(format!("{} is required", what))),
    }
}

fn check_selector(selector: &str) -> Result<(), ConfigError> {
    Selector::parse(selector)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidSelector(format!("'{}': {}", selector, e)))
}

fn check_pattern(pattern: &str) -> Result<(), ConfigError> {
    Regex::new(pattern)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidPattern(format!("'{}': {}", pattern, e)))
}
