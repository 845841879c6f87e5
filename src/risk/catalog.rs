// Pattern catalog: lexical risk patterns and the entity impact matrix
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::config::ConfigValidator;
use crate::error::AppError;
use crate::models::{Entity, RiskCategory, FALLBACK_IMPACT_AREAS};

/// Impact level used when neither the entity type nor its class has a row.
pub const DEFAULT_IMPACT_LEVEL: f64 = 0.5;

/// Static classification tables. Loaded once and shared read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternCatalog {
    /// Case-insensitive regex fragments per category, in evaluation order.
    pub patterns: BTreeMap<RiskCategory, Vec<String>>,
    /// Entity type (or `DEFAULT_<CLASS>`) -> category -> impact level.
    pub impact_matrix: BTreeMap<String, BTreeMap<RiskCategory, f64>>,
    #[serde(default)]
    pub impact_areas: BTreeMap<RiskCategory, Vec<String>>,
    #[serde(default)]
    pub explanations: BTreeMap<RiskCategory, String>,
}

fn patterns(list: &[&str]) -> Vec<String> {
    list.iter().map(|p| p.to_string()).collect()
}

/// Values in `RiskCategory::ALL` order.
fn impact_row(values: [f64; 8]) -> BTreeMap<RiskCategory, f64> {
    RiskCategory::ALL.iter().copied().zip(values).collect()
}

impl Default for PatternCatalog {
    fn default() -> Self {
        let mut pattern_table = BTreeMap::new();
        pattern_table.insert(RiskCategory::Market, patterns(&[
            r"(market|stock|index|bond)\s+(crash|collapse|volatility|correction|sell-?off)",
            r"(interest rate|yield|spread)s?\s+(rise|increase|jump|spike|volatility)",
            r"(bull|bear)\s+market",
            r"market\s+(uncertainty|turmoil|panic)",
            r"(bubble|overvaluation|undervaluation|valuation)",
        ]));
        pattern_table.insert(RiskCategory::Credit, patterns(&[
            r"(default|bankruptcy|insolvency|restructuring)",
            r"(debt|loan)\s+(problem|issue|concern|crisis)",
            r"(credit|debt)\s+rating\s+(downgrade|cut|lower)",
            r"(non-performing|bad)\s+(loan|debt)",
            r"debt\s+burden",
        ]));
        pattern_table.insert(RiskCategory::Liquidity, patterns(&[
            r"(liquidity|cash|funding)\s+(problem|issue|concern|crisis|squeeze|crunch)",
            r"(unable|difficulty)\s+to\s+(raise|secure)\s+(funding|capital|money)",
            r"(frozen|dry up|seized)\s+(credit|market|funding)",
            r"(bank|financial)\s+run",
            r"(withdrawal|redemption)s?\s+surge",
        ]));
        pattern_table.insert(RiskCategory::Operational, patterns(&[
            r"(operational|system|technical)\s+(failure|breakdown|outage|disruption)",
            r"(cyber|security)\s+(attack|breach|incident|threat)",
            r"(fraud|misconduct|corruption|embezzlement)",
            r"(human|employee)\s+error",
            r"(natural disaster|fire|flood|earthquake|pandemic|supply chain)\s+(disruption|issue)",
        ]));
        pattern_table.insert(RiskCategory::Legal, patterns(&[
            r"(lawsuit|litigation|legal action|sued|sue)",
            r"(fine|penalty|sanction)",
            r"(regulatory|compliance|legal)\s+(violation|breach)",
            r"(investigation|probe|inquiry)",
            r"(settlement|judgment)\s+against",
        ]));
        pattern_table.insert(RiskCategory::Strategic, patterns(&[
            r"(strategic|strategy)\s+(failure|mistake|error)",
            r"(competition|competitor|competitive)\s+(pressure|threat)",
            r"(merger|acquisition|partnership)\s+(failure|problem|issue|collapse)",
            r"(business model|strategy)\s+(change|shift)",
            r"(enter|exit)s?\s+(market|business|industry)",
        ]));
        pattern_table.insert(RiskCategory::Reputation, patterns(&[
            r"(reputation|reputational)\s+(damage|harm|crisis|issue)",
            r"(public|customer|consumer)\s+(backlash|criticism|protest)",
            r"(scandal|controversy)",
            r"(social media|pr)\s+(crisis|disaster|backlash)",
            r"(boycott|public relations)\s+issue",
        ]));
        pattern_table.insert(RiskCategory::Regulatory, patterns(&[
            r"(regulation|regulatory)\s+(change|reform|tightening|overhaul)",
            r"(compliance|regulatory)\s+(cost|burden|requirement)",
            r"(legislation|law|rule)s?\s+(change|proposed|passed)",
            r"(regulatory|government)\s+(crackdown|enforcement)",
            r"(license|permit|approval)\s+(revoked|revoke|suspended|suspend|denied|deny|delay)",
        ]));

        // Row values follow RiskCategory::ALL order.
        let rows: [(&str, [f64; 8]); 11] = [
            ("Company", [0.7, 0.8, 0.8, 0.9, 0.7, 0.9, 0.8, 0.7]),
            ("Bank", [0.9, 0.9, 0.9, 0.8, 0.7, 0.7, 0.9, 0.9]),
            ("Insurance", [0.7, 0.6, 0.7, 0.8, 0.8, 0.7, 0.8, 0.8]),
            ("Asset Manager", [0.9, 0.6, 0.8, 0.7, 0.6, 0.8, 0.9, 0.7]),
            ("Regulator", [0.3, 0.3, 0.3, 0.6, 0.4, 0.5, 0.7, 0.2]),
            ("Central Bank", [0.5, 0.4, 0.5, 0.6, 0.5, 0.6, 0.8, 0.4]),
            ("Government", [0.6, 0.7, 0.5, 0.6, 0.5, 0.7, 0.8, 0.4]),
            ("Exchange", [0.9, 0.5, 0.8, 0.9, 0.6, 0.7, 0.8, 0.8]),
            ("DEFAULT_ORGANIZATION", [0.7, 0.7, 0.6, 0.8, 0.7, 0.8, 0.8, 0.7]),
            ("DEFAULT_PERSON", [0.3, 0.3, 0.2, 0.4, 0.7, 0.5, 0.8, 0.3]),
            ("DEFAULT_INSTRUMENT", [0.8, 0.5, 0.7, 0.6, 0.5, 0.7, 0.6, 0.5]),
        ];
        let impact_matrix: BTreeMap<String, BTreeMap<RiskCategory, f64>> = rows
            .into_iter()
            .map(|(class, values)| (class.to_string(), impact_row(values)))
            .collect();

        let mut impact_areas = BTreeMap::new();
        let areas = |list: [&str; 3]| list.iter().map(|a| a.to_string()).collect::<Vec<String>>();
        impact_areas.insert(RiskCategory::Market, areas(["Financial Markets", "Investment Performance", "Asset Valuations"]));
        impact_areas.insert(RiskCategory::Credit, areas(["Debt Servicing", "Counterparty Exposure", "Credit Ratings"]));
        impact_areas.insert(RiskCategory::Liquidity, areas(["Cash Flow", "Funding Access", "Asset Liquidity"]));
        impact_areas.insert(RiskCategory::Operational, areas(["Business Operations", "Systems & Technology", "People & Process"]));
        impact_areas.insert(RiskCategory::Legal, areas(["Legal Liability", "Compliance", "Corporate Governance"]));
        impact_areas.insert(RiskCategory::Strategic, areas(["Business Strategy", "Competitive Position", "Business Model"]));
        impact_areas.insert(RiskCategory::Reputation, areas(["Brand Value", "Customer Trust", "Public Perception"]));
        impact_areas.insert(RiskCategory::Regulatory, areas(["Regulatory Compliance", "Policy Environment", "Licensing"]));

        let mut explanations = BTreeMap::new();
        explanations.insert(RiskCategory::Market, "Market risk covers losses from adverse price movements and volatility in traded markets.".to_string());
        explanations.insert(RiskCategory::Credit, "Credit risk covers losses from counterparty default or deteriorating credit quality.".to_string());
        explanations.insert(RiskCategory::Liquidity, "Liquidity risk covers losses or disruption from being unable to meet cash flow obligations.".to_string());
        explanations.insert(RiskCategory::Operational, "Operational risk covers losses from failed internal processes, people, systems or external disruptions.".to_string());
        explanations.insert(RiskCategory::Legal, "Legal risk covers losses from litigation, enforcement actions or contractual disputes.".to_string());
        explanations.insert(RiskCategory::Strategic, "Strategic risk covers losses from poor business decisions or failed execution of strategy.".to_string());
        explanations.insert(RiskCategory::Reputation, "Reputation risk covers losses from damage to public image, brand or stakeholder trust.".to_string());
        explanations.insert(RiskCategory::Regulatory, "Regulatory risk covers losses from regulatory change or compliance failures.".to_string());

        Self {
            patterns: pattern_table,
            impact_matrix,
            impact_areas,
            explanations,
        }
    }
}

impl PatternCatalog {
    /// Load a catalog from JSON and validate it.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .map_err(|e| AppError::ConfigError(format!("Cannot read catalog {}: {}", path.display(), e)))?;
        let catalog: PatternCatalog = serde_json::from_str(&raw)
            .map_err(|e| AppError::ConfigError(format!("Invalid catalog {}: {}", path.display(), e)))?;
        catalog.validate()?;

        info!(path = %path.display(), "Loaded pattern catalog");
        Ok(catalog)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        let validator = ConfigValidator::new();

        for category in RiskCategory::ALL {
            let has_patterns = self
                .patterns
                .get(&category)
                .map(|list| list.iter().any(|p| !p.trim().is_empty()))
                .unwrap_or(false);
            if !has_patterns {
                return Err(AppError::ConfigError(format!("No patterns defined for {}", category)));
            }
        }

        for (row, levels) in &self.impact_matrix {
            for (category, level) in levels {
                validator.validate_range(*level, 0.0, 1.0, &format!("impact_matrix.{}.{}", row, category))?;
            }
        }

        for (category, areas) in &self.impact_areas {
            if areas.is_empty() {
                return Err(AppError::ConfigError(format!("Empty impact area list for {}", category)));
            }
        }

        Ok(())
    }

    /// Lookup order: subtype row, type row, `DEFAULT_<CLASS>` row, then 0.5.
    pub fn impact_level(&self, entity: &Entity, category: RiskCategory) -> f64 {
        let exact_keys = entity
            .subtype
            .as_deref()
            .into_iter()
            .chain(std::iter::once(entity.entity_type.as_str()));

        for key in exact_keys {
            if let Some(level) = self.impact_matrix.get(key).and_then(|row| row.get(&category)) {
                return *level;
            }
        }

        entity
            .entity_class()
            .and_then(|class| self.impact_matrix.get(class.default_row_key()))
            .and_then(|row| row.get(&category))
            .copied()
            .unwrap_or(DEFAULT_IMPACT_LEVEL)
    }

    pub fn impact_areas(&self, category: RiskCategory) -> Vec<String> {
        match self.impact_areas.get(&category) {
            Some(areas) if !areas.is_empty() => areas.clone(),
            _ => FALLBACK_IMPACT_AREAS.iter().map(|area| area.to_string()).collect(),
        }
    }

    pub fn explanation(&self, category: RiskCategory) -> &str {
        self.explanations.get(&category).map(String::as_str).unwrap_or("")
    }

    /// Compile every pattern once. Patterns match case-insensitively from a word boundary.
    pub fn compile(self) -> Result<CompiledCatalog, AppError> {
        self.validate()?;

        let mut matchers = Vec::with_capacity(RiskCategory::ALL.len());
        for category in RiskCategory::ALL {
            let mut regexes = Vec::new();
            for pattern in self.patterns.get(&category).into_iter().flatten() {
                if pattern.trim().is_empty() {
                    continue;
                }
                let regex = Regex::new(&format!(r"(?i)\b(?:{})", pattern)).map_err(|e| {
                    AppError::PatternError(format!("{} pattern '{}': {}", category, pattern, e))
                })?;
                regexes.push(regex);
            }
            debug!(category = %category, patterns = regexes.len(), "Compiled category patterns");
            matchers.push(CategoryMatcher { category, regexes });
        }

        Ok(CompiledCatalog { catalog: self, matchers })
    }
}

#[derive(Debug, Clone)]
struct CategoryMatcher {
    category: RiskCategory,
    regexes: Vec<Regex>,
}

/// Pattern hits for one category over one corpus.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryScan {
    pub category: RiskCategory,
    pub match_count: usize,
    /// Distinct matched substrings, sorted.
    pub indicators: BTreeSet<String>,
}

/// A validated catalog with its patterns compiled.
#[derive(Debug, Clone)]
pub struct CompiledCatalog {
    catalog: PatternCatalog,
    matchers: Vec<CategoryMatcher>,
}

impl CompiledCatalog {
    pub fn builtin() -> Result<Self, AppError> {
        PatternCatalog::default().compile()
    }

    pub fn catalog(&self) -> &PatternCatalog {
        &self.catalog
    }

    /// Scan a corpus against every category in rank order. Categories without
    /// a single hit are still reported with `match_count == 0`.
    pub fn scan(&self, corpus: &str) -> Vec<CategoryScan> {
        self.matchers
            .iter()
            .map(|matcher| {
                let mut match_count = 0;
                let mut indicators = BTreeSet::new();
                for regex in &matcher.regexes {
                    for found in regex.find_iter(corpus) {
                        match_count += 1;
                        indicators.insert(found.as_str().to_string());
                    }
                }
                CategoryScan {
                    category: matcher.category,
                    match_count,
                    indicators,
                }
            })
            .collect()
    }

    pub fn impact_level(&self, entity: &Entity, category: RiskCategory) -> f64 {
        self.catalog.impact_level(entity, category)
    }

    pub fn impact_areas(&self, category: RiskCategory) -> Vec<String> {
        self.catalog.impact_areas(category)
    }

    pub fn explanation(&self, category: RiskCategory) -> &str {
        self.catalog.explanation(category)
    }
}
