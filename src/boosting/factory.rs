//! Boosting factory.
//!
//! Picks the concrete [`Boosting`] implementation for a requested family
//! name and/or a saved model. A saved model's first line names its storage
//! tag: `tree` models load into every family, `cegb_tree` models only into
//! the cost-aware one.

use crate::boosting::{read_model_tag, Boosting, Cegb, Gbdt};
use crate::config::Config;
use crate::core::error::{LightGBMError, Result};
use crate::core::types::BoostingType;
use std::fs;
use std::path::Path;

/// Creates an empty booster for `config.boosting_type`.
pub fn create_boosting_from_config(config: &Config) -> Result<Box<dyn Boosting>> {
    let boosting: Box<dyn Boosting> = match config.boosting_type {
        BoostingType::CEGB => Box::new(Cegb::with_config(config.clone())?),
        kind => Box::new(Gbdt::with_config(kind, config.clone())?),
    };
    Ok(boosting)
}

fn new_boosting(kind: BoostingType) -> Result<Box<dyn Boosting>> {
    create_boosting_from_config(&Config {
        boosting_type: kind,
        ..Config::default()
    })
}

/// Creates a booster of family `type_name`, optionally loaded from a model file.
///
/// Without a file an unknown family name yields `Ok(None)`. With a file the
/// tag is read first: an unknown tag is [`LightGBMError::UnknownModelTag`],
/// an unknown family is [`LightGBMError::UnknownBoostingType`] and a family
/// that cannot load the tag is [`LightGBMError::TypeMismatch`].
pub fn create_boosting(
    type_name: &str,
    model_file: Option<&Path>,
) -> Result<Option<Box<dyn Boosting>>> {
    let Some(path) = model_file else {
        return match type_name.parse::<BoostingType>() {
            Ok(kind) => {
                log::debug!("Creating empty {} booster", kind);
                new_boosting(kind).map(Some)
            }
            Err(_) => {
                log::debug!("No boosting family named '{}'", type_name);
                Ok(None)
            }
        };
    };

    let model = fs::read_to_string(path)?;
    let tag = read_model_tag(&model)?;
    let kind: BoostingType = type_name.parse()?;
    if !tag.accepts(kind) {
        return Err(LightGBMError::type_mismatch(type_name, tag.as_str()));
    }

    log::debug!(
        "Creating {} booster for {} model {}",
        kind,
        tag,
        path.display()
    );
    let mut boosting = new_boosting(kind)?;
    boosting.load_model_from_string(&model)?;
    Ok(Some(boosting))
}

/// Creates a booster from model text; the tag alone decides the family.
///
/// `cegb_tree` loads into [`Cegb`], `tree` into a `gbdt` [`Gbdt`].
pub fn create_boosting_from_string(model: &str) -> Result<Box<dyn Boosting>> {
    let tag = read_model_tag(model)?;
    let kind = tag.default_boosting_type();
    log::debug!("Model tagged {} loads as {}", tag, kind);

    let mut boosting = new_boosting(kind)?;
    boosting.load_model_from_string(model)?;
    Ok(boosting)
}

/// Creates a booster from a model file; the tag alone decides the family.
pub fn create_boosting_from_file(path: &Path) -> Result<Box<dyn Boosting>> {
    let model = fs::read_to_string(path)?;
    log::info!("Loading model from {}", path.display());
    create_boosting_from_string(&model)
}
