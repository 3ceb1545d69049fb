//! Text serialization of boosted models.
//!
//! The first line is the storage tag (`tree` or `cegb_tree`). It is followed
//! by `key=value` header lines, one `Tree=<i>` block per tree terminated by
//! `end of trees`, and a `parameters:` section of `[key: value]` lines.
//! Floats are written with `{}` formatting, which is the shortest text that
//! parses back to the same value.

use crate::config::{format_penalty_table, parse_penalty_table, CegbConfig};
use crate::core::constants::MODEL_VERSION;
use crate::core::error::{LightGBMError, ModelTextError, Result};
use crate::core::types::{BoostingType, FeatureIndex, ModelTag, ObjectiveType};
use crate::tree::{NodeSplit, Tree, TreeNode};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

const TREE_PREFIX: &str = "Tree=";
const END_OF_TREES: &str = "end of trees";
const PARAMETERS: &str = "parameters:";
const END_OF_PARAMETERS: &str = "end of parameters";

/// Cost-aware state carried by `cegb_tree` models.
#[derive(Debug, Clone, PartialEq)]
pub struct CegbSection {
    pub config: CegbConfig,
    /// Features whose coupled cost the ensemble has paid
    pub coupled_feature_used: Vec<FeatureIndex>,
}

/// In-memory form of a model file.
#[derive(Debug, Clone)]
pub struct ModelText {
    pub tag: ModelTag,
    pub boosting_type: BoostingType,
    pub objective: ObjectiveType,
    pub num_features: usize,
    /// `None` means every tree is used for prediction
    pub num_iteration_for_pred: Option<usize>,
    pub cegb: Option<CegbSection>,
    pub trees: Vec<Tree>,
    pub parameters: BTreeMap<String, String>,
}

/// Reads the storage tag from the first line of a model.
pub fn read_model_tag(text: &str) -> Result<ModelTag> {
    let first = text
        .lines()
        .next()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .ok_or(ModelTextError::Empty)?;
    first.parse()
}

impl ModelText {
    /// Parses a complete model.
    pub fn parse(text: &str) -> Result<Self> {
        let tag = read_model_tag(text)?;
        let mut lines = text
            .lines()
            .enumerate()
            .skip(1)
            .map(|(index, line)| (index + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty())
            .peekable();

        let mut header = KeyValues::new(None);
        while let Some(&(number, line)) = lines.peek() {
            if line.starts_with(TREE_PREFIX) || line == END_OF_TREES || line == PARAMETERS {
                break;
            }
            header.insert(number, line)?;
            lines.next();
        }

        let mut blocks: Vec<KeyValues> = Vec::new();
        let mut terminated = false;
        for (number, line) in lines.by_ref() {
            if line == END_OF_TREES {
                terminated = true;
                break;
            }
            if line == PARAMETERS {
                break;
            }
            if let Some(index) = line.strip_prefix(TREE_PREFIX) {
                let index: usize = index.trim().parse().map_err(|_| ModelTextError::InvalidValue {
                    line: number,
                    key: "Tree".to_string(),
                    value: index.to_string(),
                })?;
                if index != blocks.len() {
                    return Err(ModelTextError::MalformedTree {
                        tree: index,
                        reason: format!("expected tree index {}", blocks.len()),
                    }
                    .into());
                }
                blocks.push(KeyValues::new(Some(index)));
                continue;
            }
            match blocks.last_mut() {
                Some(block) => block.insert(number, line)?,
                None => header.insert(number, line)?,
            }
        }
        if !terminated {
            return Err(ModelTextError::Unterminated { marker: END_OF_TREES }.into());
        }

        let parameters = parse_parameters(&mut lines)?;

        let boosting_type: BoostingType = header.parse_typed("boosting_type")?;
        let objective: ObjectiveType = header.parse_typed("objective")?;
        let num_features: usize = header.parse("num_features")?;
        let num_iteration_for_pred: i64 = header.parse("num_iteration_for_pred")?;
        let num_iteration_for_pred = usize::try_from(num_iteration_for_pred).ok();

        if let Some((_, version)) = header.get("version") {
            if version != MODEL_VERSION {
                log::warn!(
                    "Model version '{}' differs from supported version '{}'",
                    version,
                    MODEL_VERSION
                );
            }
        }

        let cegb = match tag {
            ModelTag::CegbTree => Some(parse_cegb_section(&header)?),
            ModelTag::Tree => None,
        };

        let trees = blocks
            .iter()
            .map(|block| parse_tree(block, num_features))
            .collect::<Result<Vec<_>>>()?;

        Ok(ModelText {
            tag,
            boosting_type,
            objective,
            num_features,
            num_iteration_for_pred,
            cegb,
            trees,
            parameters,
        })
    }

    /// Renders the model as text.
    pub fn to_text(&self) -> String {
        let mut lines = vec![
            self.tag.to_string(),
            format!("version={}", MODEL_VERSION),
            format!("boosting_type={}", self.boosting_type),
            format!("objective={}", self.objective),
            format!("num_features={}", self.num_features),
            format!(
                "num_iteration_for_pred={}",
                self.num_iteration_for_pred
                    .map_or_else(|| "-1".to_string(), |k| k.to_string())
            ),
        ];

        if let Some(cegb) = &self.cegb {
            lines.push(format!("cegb_tradeoff={}", cegb.config.tradeoff));
            lines.push(format!(
                "cegb_independent_branches={}",
                cegb.config.independent_branches
            ));
            lines.push(format!(
                "cegb_penalty_feature_lazy={}",
                format_penalty_table(&cegb.config.penalty_feature_lazy)
            ));
            lines.push(format!(
                "cegb_penalty_feature_coupled={}",
                format_penalty_table(&cegb.config.penalty_feature_coupled)
            ));
            lines.push(format!(
                "cegb_coupled_feature_used={}",
                format_array(&cegb.coupled_feature_used)
            ));
        }
        lines.push(String::new());

        for (index, tree) in self.trees.iter().enumerate() {
            lines.push(format!("{}{}", TREE_PREFIX, index));
            write_tree(tree, &mut lines);
            lines.push(String::new());
        }
        lines.push(END_OF_TREES.to_string());
        lines.push(String::new());

        lines.push(PARAMETERS.to_string());
        for (key, value) in &self.parameters {
            lines.push(format!("[{}: {}]", key, value));
        }
        lines.push(END_OF_PARAMETERS.to_string());

        let mut text = lines.join("\n");
        text.push('\n');
        text
    }
}

/// `key=value` lines of one section, remembering where each came from.
struct KeyValues {
    tree: Option<usize>,
    entries: BTreeMap<String, (usize, String)>,
}

impl KeyValues {
    fn new(tree: Option<usize>) -> Self {
        KeyValues {
            tree,
            entries: BTreeMap::new(),
        }
    }

    fn insert(&mut self, number: usize, line: &str) -> std::result::Result<(), ModelTextError> {
        let (key, value) = line.split_once('=').ok_or_else(|| ModelTextError::InvalidValue {
            line: number,
            key: line.to_string(),
            value: "expected key=value".to_string(),
        })?;
        self.entries
            .insert(key.trim().to_string(), (number, value.trim().to_string()));
        Ok(())
    }

    fn get(&self, key: &str) -> Option<(usize, &str)> {
        self.entries
            .get(key)
            .map(|(number, value)| (*number, value.as_str()))
    }

    fn required(&self, key: &str) -> std::result::Result<(usize, &str), ModelTextError> {
        self.get(key).ok_or_else(|| match self.tree {
            Some(tree) => ModelTextError::MalformedTree {
                tree,
                reason: format!("missing key '{}'", key),
            },
            None => ModelTextError::MissingKey {
                key: key.to_string(),
            },
        })
    }

    fn parse<T: FromStr>(&self, key: &str) -> std::result::Result<T, ModelTextError> {
        let (number, value) = self.required(key)?;
        value.parse().map_err(|_| invalid(number, key, value))
    }

    /// Parses a value whose own parser reports a crate error.
    fn parse_typed<T>(&self, key: &str) -> Result<T>
    where
        T: FromStr<Err = LightGBMError>,
    {
        let (_, value) = self.required(key)?;
        value.parse()
    }

    fn array<T: FromStr>(
        &self,
        key: &str,
        expected: usize,
    ) -> std::result::Result<Vec<T>, ModelTextError> {
        let (number, value) = self.required(key)?;
        let values = parse_array(number, key, value)?;
        if values.len() != expected {
            return Err(ModelTextError::ArrayLength {
                tree: self.tree.unwrap_or_default(),
                key: key.to_string(),
                expected,
                actual: values.len(),
            });
        }
        Ok(values)
    }
}

fn invalid(line: usize, key: &str, value: &str) -> ModelTextError {
    ModelTextError::InvalidValue {
        line,
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn parse_array<T: FromStr>(
    line: usize,
    key: &str,
    value: &str,
) -> std::result::Result<Vec<T>, ModelTextError> {
    value
        .split_whitespace()
        .map(|s| s.parse().map_err(|_| invalid(line, key, s)))
        .collect()
}

fn format_array<T: Display>(values: &[T]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_parameters<'a, I>(lines: &mut I) -> Result<BTreeMap<String, String>>
where
    I: Iterator<Item = (usize, &'a str)>,
{
    let mut parameters = BTreeMap::new();
    let Some((number, line)) = lines.next() else {
        return Ok(parameters);
    };
    if line != PARAMETERS {
        return Err(invalid(number, "parameters", line).into());
    }

    for (number, line) in lines {
        if line == END_OF_PARAMETERS {
            return Ok(parameters);
        }
        let entry = line
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .and_then(|inner| inner.split_once(": ").or_else(|| inner.split_once(':')))
            .ok_or_else(|| invalid(number, "parameters", line))?;
        parameters.insert(entry.0.trim().to_string(), entry.1.trim().to_string());
    }

    Err(ModelTextError::Unterminated {
        marker: END_OF_PARAMETERS,
    }
    .into())
}

fn parse_cegb_section(header: &KeyValues) -> Result<CegbSection> {
    let table = |key: &str| -> Result<BTreeMap<FeatureIndex, f64>> {
        match header.get(key) {
            Some((_, value)) => parse_penalty_table(key, value),
            None => Ok(BTreeMap::new()),
        }
    };

    let config = CegbConfig {
        tradeoff: header.parse("cegb_tradeoff")?,
        independent_branches: header.parse("cegb_independent_branches")?,
        penalty_feature_lazy: table("cegb_penalty_feature_lazy")?,
        penalty_feature_coupled: table("cegb_penalty_feature_coupled")?,
    };
    let (number, used) = header.required("cegb_coupled_feature_used")?;
    let coupled_feature_used = parse_array(number, "cegb_coupled_feature_used", used)?;

    Ok(CegbSection {
        config,
        coupled_feature_used,
    })
}

fn parse_tree(block: &KeyValues, num_features: usize) -> Result<Tree> {
    let tree_index = block.tree.unwrap_or_default();
    let malformed = |reason: String| ModelTextError::MalformedTree {
        tree: tree_index,
        reason,
    };

    let num_nodes: usize = block.parse("num_nodes")?;
    let num_leaves: usize = block.parse("num_leaves")?;
    let shrinkage: f64 = block.parse("shrinkage")?;
    let split_feature: Vec<i64> = block.array("split_feature", num_nodes)?;
    let threshold: Vec<f64> = block.array("threshold", num_nodes)?;
    let split_gain: Vec<f64> = block.array("split_gain", num_nodes)?;
    let left_child: Vec<i64> = block.array("left_child", num_nodes)?;
    let right_child: Vec<i64> = block.array("right_child", num_nodes)?;
    let default_left: Vec<u8> = block.array("default_left", num_nodes)?;
    let leaf_value: Vec<f64> = block.array("leaf_value", num_nodes)?;

    let mut nodes = Vec::with_capacity(num_nodes);
    for i in 0..num_nodes {
        let mut node = TreeNode::new_leaf(0.0, 0.0, 0, 0, None);
        if split_feature[i] < 0 {
            node.set_leaf_output(leaf_value[i]);
        } else {
            let feature = split_feature[i] as usize;
            if feature >= num_features {
                return Err(malformed(format!(
                    "node {} splits on feature {} of {}",
                    i, feature, num_features
                ))
                .into());
            }
            let child = |value: i64| {
                usize::try_from(value)
                    .map_err(|_| malformed(format!("internal node {} has no child {}", i, value)))
            };
            node.set_split(NodeSplit {
                feature,
                threshold: threshold[i],
                gain: split_gain[i],
                default_left: default_left[i] != 0,
                left_child: child(left_child[i])?,
                right_child: child(right_child[i])?,
            });
        }
        nodes.push(node);
    }

    let tree = Tree::from_nodes(nodes, shrinkage).map_err(|e| malformed(format!("{:#}", e)))?;
    if tree.num_leaves() != num_leaves {
        return Err(malformed(format!(
            "num_leaves is {} but the nodes form {} leaves",
            num_leaves,
            tree.num_leaves()
        ))
        .into());
    }
    Ok(tree)
}

fn write_tree(tree: &Tree, lines: &mut Vec<String>) {
    let nodes = tree.nodes();
    let split = |node: &TreeNode| node.split().copied();

    let split_feature: Vec<i64> = nodes
        .iter()
        .map(|n| split(n).map_or(-1, |s| s.feature as i64))
        .collect();
    let threshold: Vec<f64> = nodes
        .iter()
        .map(|n| split(n).map_or(0.0, |s| s.threshold))
        .collect();
    let split_gain: Vec<f64> = nodes
        .iter()
        .map(|n| split(n).map_or(0.0, |s| s.gain))
        .collect();
    let left_child: Vec<i64> = nodes
        .iter()
        .map(|n| split(n).map_or(-1, |s| s.left_child as i64))
        .collect();
    let right_child: Vec<i64> = nodes
        .iter()
        .map(|n| split(n).map_or(-1, |s| s.right_child as i64))
        .collect();
    let default_left: Vec<u8> = nodes
        .iter()
        .map(|n| split(n).map_or(0, |s| u8::from(s.default_left)))
        .collect();
    let leaf_value: Vec<f64> = nodes
        .iter()
        .map(|n| if n.is_leaf() { n.leaf_output() } else { 0.0 })
        .collect();

    lines.push(format!("num_nodes={}", tree.num_nodes()));
    lines.push(format!("num_leaves={}", tree.num_leaves()));
    lines.push(format!("shrinkage={}", tree.shrinkage()));
    lines.push(format!("split_feature={}", format_array(&split_feature)));
    lines.push(format!("threshold={}", format_array(&threshold)));
    lines.push(format!("split_gain={}", format_array(&split_gain)));
    lines.push(format!("left_child={}", format_array(&left_child)));
    lines.push(format!("right_child={}", format_array(&right_child)));
    lines.push(format!("default_left={}", format_array(&default_left)));
    lines.push(format!("leaf_value={}", format_array(&leaf_value)));
}
