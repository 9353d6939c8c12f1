//! Parser for ASF skeleton descriptions.
//!
//! The grammar is the Acclaim skeleton format: header sections up to
//! `:bonedata`, one `begin`/`end` block per bone, then a `:hierarchy`
//! section listing parent -> children edges. The root joint is not declared
//! as a bone; it is synthesized with 6 degrees of freedom (3 translation +
//! 3 rotation) and an identity local frame.
//!
//! Only structure is read here. Channel values live in the companion AMC
//! file, parsed by [`crate::amc`].

use std::collections::HashMap;

use glam::DVec3;

use crate::error::{Error, Result};
use crate::math::RotationOrder;
use crate::skeleton::{DofLimits, Joint, JointId, Skeleton, ROOT_NAME};

/// Line cursor over a skeleton or motion description.
///
/// Yields trimmed, non-empty, non-comment lines split into whitespace
/// tokens, mirroring how both mocap formats are consumed line by line.
pub(crate) struct Lines<'a> {
    inner: std::str::Lines<'a>,
}

impl<'a> Lines<'a> {
    pub(crate) fn new(src: &'a str) -> Self {
        Self { inner: src.lines() }
    }

    pub(crate) fn next(&mut self) -> Option<Vec<&'a str>> {
        for line in self.inner.by_ref() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            return Some(line.split_whitespace().collect());
        }
        None
    }
}

fn malformed(msg: impl Into<String>) -> Error {
    Error::MalformedSkeleton(msg.into())
}

fn parse_value(token: &str, context: &str) -> Result<f64> {
    token
        .parse::<f64>()
        .map_err(|_| malformed(format!("non-numeric value `{token}` in {context}")))
}

/// Parse one `(min max)` limit pair; parentheses may touch the numbers.
fn parse_limit_pair(tokens: &[&str], bone: &str) -> Result<DofLimits> {
    if tokens.len() != 2 {
        return Err(malformed(format!(
            "bone `{bone}`: limit pair must hold two values, got {}",
            tokens.len()
        )));
    }
    let min = parse_value(tokens[0].trim_start_matches('('), "limits")?;
    let max = parse_value(tokens[1].trim_end_matches(')'), "limits")?;
    Ok(DofLimits { min, max })
}

/// Parsed fields of one `begin`/`end` bone block.
#[derive(Default)]
struct BoneBlock {
    name: Option<String>,
    direction: Option<DVec3>,
    length: Option<f64>,
    axis: Option<(DVec3, RotationOrder)>,
    dof: Vec<String>,
    limits: Vec<DofLimits>,
}

impl BoneBlock {
    fn into_joint(self) -> Result<Joint> {
        let name = self.name.ok_or_else(|| malformed("bone without a name"))?;
        let direction = self
            .direction
            .ok_or_else(|| malformed(format!("bone `{name}` missing direction")))?;
        let length = self
            .length
            .ok_or_else(|| malformed(format!("bone `{name}` missing length")))?;
        let (axis, order) = self
            .axis
            .ok_or_else(|| malformed(format!("bone `{name}` missing axis")))?;

        if name == ROOT_NAME {
            return Err(malformed(format!(
                "`{ROOT_NAME}` is reserved and may not be declared as a bone"
            )));
        }
        if self.dof.len() != self.limits.len() {
            return Err(malformed(format!(
                "bone `{name}`: {} dof channels but {} limit pairs",
                self.dof.len(),
                self.limits.len()
            )));
        }

        // Limits land in fixed x/y/z slots no matter the declaration order;
        // a present slot marks the axis as animated.
        let mut limits = [None; 3];
        for (channel, lm) in self.dof.iter().zip(self.limits.iter()) {
            let slot = match channel.as_str() {
                "rx" => 0,
                "ry" => 1,
                "rz" => 2,
                other => {
                    return Err(malformed(format!(
                        "bone `{name}`: unsupported dof channel `{other}`"
                    )))
                }
            };
            limits[slot] = Some(*lm);
        }

        Ok(Joint::new(name, direction, length, axis, order, limits))
    }
}

fn parse_bone_block(lines: &mut Lines<'_>) -> Result<BoneBlock> {
    let mut block = BoneBlock::default();
    loop {
        let tokens = lines
            .next()
            .ok_or_else(|| malformed("unterminated bone block (missing `end`)"))?;
        match tokens[0] {
            "end" => return Ok(block),
            "id" => {}
            "name" => {
                block.name = Some(
                    tokens
                        .get(1)
                        .ok_or_else(|| malformed("`name` without a value"))?
                        .to_string(),
                );
            }
            "direction" => {
                if tokens.len() != 4 {
                    return Err(malformed("`direction` expects three components"));
                }
                block.direction = Some(DVec3::new(
                    parse_value(tokens[1], "direction")?,
                    parse_value(tokens[2], "direction")?,
                    parse_value(tokens[3], "direction")?,
                ));
            }
            "length" => {
                let token = tokens
                    .get(1)
                    .ok_or_else(|| malformed("`length` without a value"))?;
                let length = parse_value(token, "length")?;
                if length < 0.0 {
                    return Err(malformed(format!("negative bone length {length}")));
                }
                block.length = Some(length);
            }
            "axis" => {
                if tokens.len() < 4 {
                    return Err(malformed("`axis` expects three angles"));
                }
                let angles = DVec3::new(
                    parse_value(tokens[1], "axis")?,
                    parse_value(tokens[2], "axis")?,
                    parse_value(tokens[3], "axis")?,
                );
                let order = match tokens.get(4) {
                    Some(token) => token.parse::<RotationOrder>().map_err(|e| malformed(e))?,
                    None => RotationOrder::default(),
                };
                block.axis = Some((angles, order));
            }
            "dof" => {
                block.dof = tokens[1..].iter().map(|t| t.to_string()).collect();
                // One `(min max)` pair per channel; the first line carries
                // the `limits` keyword, continuation lines just the pair.
                let bone = block.name.clone().unwrap_or_default();
                for i in 0..block.dof.len() {
                    let mut pair = lines.next().ok_or_else(|| {
                        malformed(format!("bone `{bone}`: missing limits for dof #{i}"))
                    })?;
                    if i == 0 {
                        if pair[0] != "limits" {
                            return Err(malformed(format!(
                                "bone `{bone}`: expected `limits`, found `{}`",
                                pair[0]
                            )));
                        }
                        pair.remove(0);
                    }
                    block.limits.push(parse_limit_pair(&pair, &bone)?);
                }
            }
            other => {
                log::debug!("ignoring unknown bone field `{other}`");
            }
        }
    }
}

fn parse_hierarchy(
    lines: &mut Lines<'_>,
    joints: &mut [Joint],
    by_name: &HashMap<String, JointId>,
) -> Result<()> {
    let begin = lines
        .next()
        .ok_or_else(|| malformed("missing `begin` after :hierarchy"))?;
    if begin[0] != "begin" {
        return Err(malformed(format!(
            "expected `begin` after :hierarchy, found `{}`",
            begin[0]
        )));
    }

    loop {
        let tokens = lines
            .next()
            .ok_or_else(|| malformed("unterminated hierarchy (missing `end`)"))?;
        if tokens[0] == "end" {
            return Ok(());
        }

        let parent = *by_name
            .get(tokens[0])
            .ok_or_else(|| Error::UnknownJoint(tokens[0].to_string()))?;
        for name in &tokens[1..] {
            let child = *by_name
                .get(*name)
                .ok_or_else(|| Error::UnknownJoint(name.to_string()))?;
            if let Some(previous) = joints[child.index()].parent {
                return Err(Error::InvalidHierarchy(format!(
                    "joint `{name}` has two parents: `{}` and `{}`",
                    joints[previous.index()].name,
                    joints[parent.index()].name
                )));
            }
            joints[child.index()].parent = Some(parent);
            joints[parent.index()].children.push(child);
        }
    }
}

/// Parse an ASF skeleton description into a linked [`Skeleton`].
///
/// Header sections before `:bonedata` (units, documentation, the `:root`
/// block) carry no structure and are skipped.
pub fn parse_asf(src: &str) -> Result<Skeleton> {
    let bonedata = src
        .lines()
        .position(|line| line.trim() == ":bonedata")
        .ok_or_else(|| malformed("missing :bonedata section"))?;
    let body: String = src
        .lines()
        .skip(bonedata + 1)
        .collect::<Vec<_>>()
        .join("\n");
    let mut lines = Lines::new(&body);

    let mut joints = vec![Joint::root()];
    let mut by_name = HashMap::new();
    by_name.insert(ROOT_NAME.to_string(), JointId::new(0));

    loop {
        let tokens = lines
            .next()
            .ok_or_else(|| malformed("missing :hierarchy section"))?;
        match tokens[0] {
            ":hierarchy" => break,
            "begin" => {
                let joint = parse_bone_block(&mut lines)?.into_joint()?;
                if by_name.contains_key(&joint.name) {
                    return Err(malformed(format!("duplicate joint name `{}`", joint.name)));
                }
                by_name.insert(joint.name.clone(), JointId::new(joints.len()));
                joints.push(joint);
            }
            other => {
                return Err(malformed(format!(
                    "expected `begin` or `:hierarchy`, found `{other}`"
                )))
            }
        }
    }

    parse_hierarchy(&mut lines, &mut joints, &by_name)?;
    log::debug!("parsed skeleton with {} joints", joints.len());
    Skeleton::new(joints)
}
