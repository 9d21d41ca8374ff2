//! Line oriented parser of shader program files.
//!
//! Every line is either an `#include`, a `#pragma once`, a `#pragma anki ...` directive or
//! plain code. Directives are consumed, except for inputs which are replaced in place by
//! their declaration. Plain code goes to the buffer of the current stage, or to the globals
//! shared by every stage when outside of a stage block.

use core::fmt::Write as _;

use crate::{
    conditional::INPUT_SITE_PREFIX,
    config::ParserConfig,
    error::{ParseError, ParseErrorKind},
    filesystem::ShaderFilesystem,
    include::{include_target, IncludeResolver, Resolved},
    input::{Input, ShaderVariableDataType},
    mutator::{MutationRewrite, Mutator, RewriteRecord},
    program::ShaderProgram,
    tokenizer::tokenize_line,
    types::{ShaderType, ShaderTypes},
    variant::{ACTIVATE_INPUT_PREFIX, BINDING_PREFIX, DESCRIPTOR_SET_MACRO, UNIFORM_BLOCK_INSTANCE},
    MutatorValue, MAX_INPUTS,
};

/// Parses a shader program file and everything it includes.
///
/// ```
/// use std::collections::HashMap;
/// use glslp::{ParserConfig, ShaderProgramParser};
///
/// let files = HashMap::from([(
///     "blit.glslp".to_owned(),
///     "#pragma anki start comp\nvoid main() {}\n#pragma anki end\n".to_owned(),
/// )]);
/// let program = ShaderProgramParser::new("blit.glslp", &files, ParserConfig::default())
///     .parse()
///     .unwrap();
/// assert!(program.mutators().is_empty());
/// ```
#[derive(Debug)]
#[non_exhaustive]
pub struct ShaderProgramParser<'fs, F: ?Sized> {
    /// Name of the root file.
    file_name: String,
    /// Where the root file and its includes are read from.
    filesystem: &'fs F,
    /// Settings of the resulting program.
    config: ParserConfig,
}

impl<'fs, F> ShaderProgramParser<'fs, F>
where
    F: ShaderFilesystem + ?Sized,
{
    /// Prepares the parse of `file_name`.
    #[inline]
    pub fn new(file_name: impl Into<String>, filesystem: &'fs F, config: ParserConfig) -> Self {
        Self {
            file_name: file_name.into(),
            filesystem,
            config,
        }
    }

    /// Parses the root file and its includes into a [`ShaderProgram`].
    ///
    /// # Errors
    ///
    /// Returns the first [`ParseError`] met, located at the offending file and line.
    #[inline]
    pub fn parse(self) -> Result<ShaderProgram, ParseError> {
        log::debug!("parsing shader program `{}`", self.file_name);
        let text = self
            .filesystem
            .read_all_text(&self.file_name)
            .map_err(|source| {
                ParseError::new(
                    &self.file_name,
                    0,
                    ParseErrorKind::IncludeNotFound {
                        name: self.file_name.clone(),
                        source,
                    },
                )
            })?;

        let mut state = ParseState::new(self.filesystem);
        state.parse_file(&self.file_name, &text, 0)?;
        let last_line = text.lines().count().max(1);
        state.finish(self.file_name, last_line, self.config)
    }
}

/// Where a stage block was opened.
#[derive(Debug)]
struct OpenStage {
    /// The stage.
    stage: ShaderType,
    /// File containing the `#pragma anki start`.
    file: String,
    /// Line of the `#pragma anki start`.
    line: usize,
}

/// Mutable state of a single parse.
#[derive(Debug)]
struct ParseState<'fs, F: ?Sized> {
    /// Reads includes and tracks `#pragma once` files.
    includes: IncludeResolver<'fs, F>,
    /// Code outside of stage blocks.
    globals: String,
    /// Code of each stage block.
    stage_code: [String; ShaderType::COUNT],
    /// Uniform block members generated by in-block inputs.
    uniform_block_members: String,
    /// Declared mutators.
    mutators: Vec<Mutator>,
    /// Declared inputs.
    inputs: Vec<Input>,
    /// Declared rewrite rules.
    rewrites: Vec<MutationRewrite>,
    /// Stages seen so far.
    shader_types: ShaderTypes,
    /// The stage block the cursor is in.
    inside_stage: Option<OpenStage>,
    /// Value of `#pragma anki descriptor_set`.
    descriptor_set: Option<u32>,
    /// Index of the `instanced` mutator.
    instance_count_mutator: Option<usize>,
    /// Id the next `const` input starts at.
    next_spec_constant_id: u32,
}

impl<'fs, F> ParseState<'fs, F>
where
    F: ShaderFilesystem + ?Sized,
{
    /// Starts an empty parse.
    fn new(filesystem: &'fs F) -> Self {
        Self {
            includes: IncludeResolver::new(filesystem),
            globals: String::new(),
            stage_code: Default::default(),
            uniform_block_members: String::new(),
            mutators: Vec::new(),
            inputs: Vec::new(),
            rewrites: Vec::new(),
            shader_types: ShaderTypes::empty(),
            inside_stage: None,
            descriptor_set: None,
            instance_count_mutator: None,
            next_spec_constant_id: 0,
        }
    }

    /// Parses the text of `file`, found at include `depth`.
    fn parse_file(&mut self, file: &str, text: &str, depth: u32) -> Result<(), ParseError> {
        let mut seen_once = false;

        for (idx, line) in text.lines().enumerate() {
            let line_number = idx + 1;
            let at_line = |kind| ParseError::new(file, line_number, kind);

            if let Some(args) = include_args(line) {
                let name = include_target(&tokenize_line(args)).map_err(at_line)?;
                match self.includes.resolve(name, depth + 1).map_err(at_line)? {
                    Resolved::Text(included) => self.parse_file(name, &included, depth + 1)?,
                    Resolved::AlreadyIncluded => {}
                }
                continue;
            }

            self.parse_line(file, line, line_number, &mut seen_once)
                .map_err(at_line)?;
        }

        Ok(())
    }

    /// Handles a line that is not an `#include`.
    fn parse_line(
        &mut self,
        file: &str,
        line: &str,
        line_number: usize,
        seen_once: &mut bool,
    ) -> Result<(), ParseErrorKind> {
        let Some(pragma) = pragma_args(line) else {
            self.push_code(line);
            return Ok(());
        };

        match tokenize_line(pragma).as_slice() {
            ["once"] => {
                if *seen_once {
                    return Err(ParseErrorKind::DuplicatePragmaOnce);
                }
                *seen_once = true;
                self.includes.mark_once(file);
                Ok(())
            }
            ["once", ..] => Err(ParseErrorKind::MalformedPragma(
                "`#pragma once` takes no arguments".to_owned(),
            )),
            ["anki", args @ ..] => {
                log::trace!("{file}:{line_number}: {}", line.trim());
                self.parse_anki_pragma(args, file, line_number)
            }
            _ => {
                self.push_code(line);
                Ok(())
            }
        }
    }

    /// Dispatches a `#pragma anki` directive.
    fn parse_anki_pragma(
        &mut self,
        args: &[&str],
        file: &str,
        line_number: usize,
    ) -> Result<(), ParseErrorKind> {
        match args {
            ["mutator", rest @ ..] => self.parse_mutator(rest),
            ["rewrite_mutation", rest @ ..] => self.parse_rewrite_mutation(rest),
            ["input", rest @ ..] => self.parse_input(rest),
            ["start", rest @ ..] => self.parse_start(rest, file, line_number),
            ["end", rest @ ..] => self.parse_end(rest),
            ["descriptor_set", rest @ ..] => self.parse_descriptor_set(rest),
            [other, ..] => Err(ParseErrorKind::MalformedPragma(format!(
                "unknown directive `#pragma anki {other}`"
            ))),
            [] => Err(ParseErrorKind::MalformedPragma(
                "missing directive after `#pragma anki`".to_owned(),
            )),
        }
    }

    /// `#pragma anki mutator [instanced] NAME VALUE0 [VALUE1 ...]`
    fn parse_mutator(&mut self, args: &[&str]) -> Result<(), ParseErrorKind> {
        let (instance_count, args) = match args {
            ["instanced", rest @ ..] => (true, rest),
            _ => (false, args),
        };
        let [name, values @ ..] = args else {
            return Err(ParseErrorKind::MalformedPragma(
                "expected `#pragma anki mutator [instanced] NAME VALUE0 [VALUE1 ...]`".to_owned(),
            ));
        };
        ensure_identifier(name)?;
        if self.mutators.iter().any(|mutator| mutator.name() == *name) {
            return Err(ParseErrorKind::DuplicateMutatorName((*name).to_owned()));
        }

        let invalid = |reason: String| ParseErrorKind::InvalidMutatorValues {
            name: (*name).to_owned(),
            reason,
        };
        if values.is_empty() {
            return Err(invalid("at least one value is required".to_owned()));
        }
        let values = values
            .iter()
            .map(|value| {
                value
                    .parse::<MutatorValue>()
                    .map_err(|_err| invalid(format!("`{value}` is not an integer")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        if values.windows(2).any(|pair| pair.first() >= pair.last()) {
            return Err(invalid("values must be strictly increasing".to_owned()));
        }

        if instance_count {
            if values.iter().any(|&value| value < 1) {
                return Err(invalid("instance counts must be at least 1".to_owned()));
            }
            if let Some(previous) = self
                .instance_count_mutator
                .and_then(|idx| self.mutators.get(idx))
            {
                return Err(ParseErrorKind::DuplicateInstanceCountMutator {
                    name: (*name).to_owned(),
                    previous: previous.name().to_owned(),
                });
            }
            self.instance_count_mutator = Some(self.mutators.len());
        }

        log::debug!("mutator `{name}` with values {values:?}");
        self.mutators.push(Mutator {
            name: (*name).to_owned(),
            values,
            instance_count,
        });
        Ok(())
    }

    /// `#pragma anki rewrite_mutation NAME V ... to NAME V ...`
    fn parse_rewrite_mutation(&mut self, args: &[&str]) -> Result<(), ParseErrorKind> {
        let mut sides = args.split(|token| *token == "to");
        let (Some(from), Some(to), None) = (sides.next(), sides.next(), sides.next()) else {
            return Err(ParseErrorKind::MalformedRewriteRule(
                "expected `NAME VALUE ... to NAME VALUE ...`".to_owned(),
            ));
        };
        let from = self.rewrite_side(from)?;
        let to = self.rewrite_side(to)?;

        if from.is_empty() {
            return Err(ParseErrorKind::MalformedRewriteRule(
                "a rule needs at least one mutator".to_owned(),
            ));
        }
        if from.len() != to.len()
            || from
                .iter()
                .zip(&to)
                .any(|(lhs, rhs)| lhs.0 != rhs.0)
        {
            return Err(ParseErrorKind::MalformedRewriteRule(
                "both sides must name the same mutators".to_owned(),
            ));
        }

        let records: Vec<RewriteRecord> = from
            .into_iter()
            .zip(to)
            .map(|((mutator_index, value_from), (_, value_to))| RewriteRecord {
                mutator_index,
                value_from,
                value_to,
            })
            .collect();
        if records
            .iter()
            .all(|record| record.value_from == record.value_to)
        {
            return Err(ParseErrorKind::MalformedRewriteRule(
                "the rule does not change any value".to_owned(),
            ));
        }

        self.rewrites.push(MutationRewrite { records });
        Ok(())
    }

    /// Parses `NAME VALUE` pairs into `(mutator index, value)`, sorted by mutator index.
    fn rewrite_side(&self, tokens: &[&str]) -> Result<Vec<(usize, MutatorValue)>, ParseErrorKind> {
        let malformed = |reason: String| ParseErrorKind::MalformedRewriteRule(reason);
        if tokens.len() % 2 != 0 {
            return Err(malformed("expected `NAME VALUE` pairs".to_owned()));
        }

        let mut side = Vec::with_capacity(tokens.len() / 2);
        for pair in tokens.chunks_exact(2) {
            let [name, value] = pair else {
                continue;
            };
            let Some(index) = self
                .mutators
                .iter()
                .position(|mutator| mutator.name() == *name)
            else {
                return Err(malformed(format!("unknown mutator `{name}`")));
            };
            let value = value
                .parse::<MutatorValue>()
                .map_err(|_err| malformed(format!("`{value}` is not an integer")))?;
            if !self
                .mutators
                .get(index)
                .is_some_and(|mutator| mutator.has_value(value))
            {
                return Err(malformed(format!(
                    "{value} is not a value of mutator `{name}`"
                )));
            }
            if side.iter().any(|&(seen, _)| seen == index) {
                return Err(malformed(format!("mutator `{name}` appears twice on one side")));
            }
            side.push((index, value));
        }

        side.sort_unstable_by_key(|&(index, _)| index);
        Ok(side)
    }

    /// `#pragma anki input [const | instanced] TYPE NAME`
    fn parse_input(&mut self, args: &[&str]) -> Result<(), ParseErrorKind> {
        let mut constant = false;
        let mut instanced = false;
        let mut rest = args;
        while let [qualifier, tail @ ..] = rest {
            let flag = match *qualifier {
                "const" => &mut constant,
                "instanced" => &mut instanced,
                _ => break,
            };
            if *flag {
                return Err(ParseErrorKind::MalformedPragma(format!(
                    "`{qualifier}` is repeated"
                )));
            }
            *flag = true;
            rest = tail;
        }

        let [type_name, name] = rest else {
            return Err(ParseErrorKind::MalformedPragma(
                "expected `#pragma anki input [const | instanced] TYPE NAME`".to_owned(),
            ));
        };
        ensure_identifier(name)?;
        if self.inputs.iter().any(|input| input.name() == *name) {
            return Err(ParseErrorKind::DuplicateInputName((*name).to_owned()));
        }
        let data_type = ShaderVariableDataType::from_name(type_name)
            .ok_or_else(|| ParseErrorKind::UnknownInputType((*type_name).to_owned()))?;

        let conflict = |reason: &str| ParseErrorKind::ConflictingInputQualifiers {
            name: (*name).to_owned(),
            reason: reason.to_owned(),
        };
        let resource = data_type.is_texture() || data_type.is_sampler();
        if constant && instanced {
            return Err(conflict("`const` and `instanced` can not be combined"));
        }
        if instanced && resource {
            return Err(conflict("textures and samplers can not be `instanced`"));
        }
        if constant && (resource || data_type.is_matrix()) {
            return Err(conflict("only scalars and vectors can be `const`"));
        }
        let instance_count_name = self
            .instance_count_mutator
            .and_then(|idx| self.mutators.get(idx))
            .map(|mutator| mutator.name().to_owned());
        if instanced && instance_count_name.is_none() {
            return Err(conflict(
                "`instanced` needs a previously declared `instanced` mutator",
            ));
        }
        if self.inputs.len() >= MAX_INPUTS {
            return Err(ParseErrorKind::TooManyInputs { max: MAX_INPUTS });
        }

        let spec_constant_id = constant.then_some(self.next_spec_constant_id);
        if constant {
            self.next_spec_constant_id += data_type.component_count();
        }
        let input = Input {
            name: (*name).to_owned(),
            index: self.inputs.len(),
            data_type,
            spec_constant_id,
            binding: None,
            instanced,
        };

        let mut declaration = format!("#define {INPUT_SITE_PREFIX}{name}\n");
        let glsl_type = data_type.glsl_name();
        // Writing to a `String` can not fail.
        if let Some(id) = spec_constant_id {
            let suffix = data_type.spec_constant_suffix();
            let _ = write!(declaration, "ANKI_SPECIALIZATION_CONSTANT_{suffix}({name}, {id});");
        } else if resource {
            let _ = write!(
                declaration,
                "layout(set = {DESCRIPTOR_SET_MACRO}, binding = {BINDING_PREFIX}{name}) \
                 uniform {glsl_type} {name};"
            );
        } else {
            let _ = write!(declaration, "#define {name} {UNIFORM_BLOCK_INSTANCE}._m_{name}");
            let array = instance_count_name
                .filter(|_| instanced)
                .map_or_else(String::new, |count| format!("[{count}]"));
            let _ = write!(
                self.uniform_block_members,
                "#if defined({ACTIVATE_INPUT_PREFIX}{name})\n\t{glsl_type} _m_{name}{array};\n#endif\n"
            );
        }
        self.push_code(&declaration);

        log::debug!("input `{name}` of type {data_type:?}, {:?}", input.class());
        self.inputs.push(input);
        Ok(())
    }

    /// `#pragma anki start STAGE`
    fn parse_start(
        &mut self,
        args: &[&str],
        file: &str,
        line_number: usize,
    ) -> Result<(), ParseErrorKind> {
        let [stage_name] = args else {
            return Err(ParseErrorKind::MalformedPragma(
                "expected `#pragma anki start {vert|tessc|tesse|geom|frag|comp}`".to_owned(),
            ));
        };
        let stage = ShaderType::from_pragma_name(stage_name).ok_or_else(|| {
            ParseErrorKind::MalformedPragma(format!("unknown shader stage `{stage_name}`"))
        })?;

        if let Some(open) = &self.inside_stage {
            return Err(ParseErrorKind::StageNestingError(format!(
                "`#pragma anki start {stage_name}` inside the `{}` stage, missing `#pragma anki end`",
                open.stage.pragma_name()
            )));
        }
        if self.shader_types.contains(stage.bit()) {
            return Err(ParseErrorKind::StageNestingError(format!(
                "stage `{stage_name}` is declared more than once"
            )));
        }
        let compute = ShaderTypes::COMPUTE;
        if (stage == ShaderType::Compute && !self.shader_types.is_empty())
            || (stage != ShaderType::Compute && self.shader_types.contains(compute))
        {
            return Err(ParseErrorKind::StageNestingError(
                "the compute stage can not be combined with graphics stages".to_owned(),
            ));
        }

        self.shader_types |= stage.bit();
        self.inside_stage = Some(OpenStage {
            stage,
            file: file.to_owned(),
            line: line_number,
        });
        Ok(())
    }

    /// `#pragma anki end`
    fn parse_end(&mut self, args: &[&str]) -> Result<(), ParseErrorKind> {
        if !args.is_empty() {
            return Err(ParseErrorKind::MalformedPragma(
                "`#pragma anki end` takes no arguments".to_owned(),
            ));
        }
        if self.inside_stage.take().is_none() {
            return Err(ParseErrorKind::StageNestingError(
                "`#pragma anki end` without `#pragma anki start`".to_owned(),
            ));
        }
        Ok(())
    }

    /// `#pragma anki descriptor_set N`
    fn parse_descriptor_set(&mut self, args: &[&str]) -> Result<(), ParseErrorKind> {
        let set = match args {
            [value] => value.parse::<u32>().ok(),
            _ => None,
        }
        .ok_or_else(|| {
            ParseErrorKind::MalformedPragma(
                "expected `#pragma anki descriptor_set N` with N a non-negative integer"
                    .to_owned(),
            )
        })?;

        match self.descriptor_set {
            Some(previous) if previous != set => {
                Err(ParseErrorKind::DescriptorSetRedeclared { previous, new: set })
            }
            _ => {
                self.descriptor_set = Some(set);
                Ok(())
            }
        }
    }

    /// Appends a line of code to the current stage, or to the globals.
    fn push_code(&mut self, line: &str) {
        let buffer = match &self.inside_stage {
            Some(open) => self.stage_code.get_mut(open.stage.index()),
            None => None,
        }
        .unwrap_or(&mut self.globals);
        buffer.push_str(line);
        buffer.push('\n');
    }

    /// Checks the final state and freezes it into a [`ShaderProgram`].
    fn finish(
        mut self,
        file_name: String,
        last_line: usize,
        config: ParserConfig,
    ) -> Result<ShaderProgram, ParseError> {
        if let Some(open) = self.inside_stage {
            return Err(ParseError::new(
                open.file,
                open.line,
                ParseErrorKind::StageNestingError(format!(
                    "stage `{}` is never closed with `#pragma anki end`",
                    open.stage.pragma_name()
                )),
            ));
        }
        if self.shader_types.is_empty() {
            return Err(ParseError::new(
                file_name,
                last_line,
                ParseErrorKind::NoShaderStages,
            ));
        }

        // Binding 0 belongs to the uniform buffer whenever there may be one.
        let mut next_binding = u32::from(self.inputs.iter().any(Input::in_uniform_block));
        for input in &mut self.inputs {
            if input.is_texture() || input.is_sampler() {
                input.binding = Some(next_binding);
                next_binding += 1;
            }
        }

        let code: Vec<&str> = [self.globals.as_str(), &self.uniform_block_members]
            .into_iter()
            .chain(self.stage_code.iter().map(String::as_str))
            .collect();
        for mutator in &self.mutators {
            if !code.iter().any(|text| contains_word(text, mutator.name())) {
                log::warn!(
                    "{file_name}: mutator `{}` is never referenced, its values only multiply the variants",
                    mutator.name()
                );
            }
        }

        log::debug!(
            "parsed `{file_name}`: {} mutators, {} inputs, {} rewrites, stages {:?}",
            self.mutators.len(),
            self.inputs.len(),
            self.rewrites.len(),
            self.shader_types
        );
        Ok(ShaderProgram {
            file_name,
            config,
            mutators: self.mutators,
            inputs: self.inputs,
            rewrites: self.rewrites,
            shader_types: self.shader_types,
            descriptor_set: self.descriptor_set.unwrap_or(0),
            instance_count_mutator: self.instance_count_mutator,
            globals: self.globals,
            stage_code: self.stage_code,
            uniform_block_members: self.uniform_block_members,
        })
    }
}

/// Text after `#include`, if the line is an include directive.
fn include_args(line: &str) -> Option<&str> {
    let rest = line.trim_start().strip_prefix('#')?.trim_start();
    let args = rest.strip_prefix("include")?;
    args.starts_with(|ch: char| ch.is_whitespace() || ch == '"' || ch == '<')
        .then_some(args)
}

/// Text after `#pragma`, if the line is a pragma.
fn pragma_args(line: &str) -> Option<&str> {
    let rest = line.trim_start().strip_prefix('#')?.trim_start();
    let args = rest.strip_prefix("pragma")?;
    (args.is_empty() || args.starts_with(char::is_whitespace)).then_some(args)
}

/// Fails unless `name` can be used as a GLSL identifier.
fn ensure_identifier(name: &str) -> Result<(), ParseErrorKind> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|first| first == '_' || first.is_ascii_alphabetic())
        && chars.all(|ch| ch == '_' || ch.is_ascii_alphanumeric());
    if valid {
        Ok(())
    } else {
        Err(ParseErrorKind::MalformedPragma(format!(
            "`{name}` is not a valid identifier"
        )))
    }
}

/// Whether `word` appears in `text` as a whole identifier.
fn contains_word(text: &str, word: &str) -> bool {
    let is_ident = |ch: char| ch == '_' || ch.is_ascii_alphanumeric();
    text.match_indices(word).any(|(start, _)| {
        let before = text[..start].chars().next_back();
        let after = text[start + word.len()..].chars().next();
        !before.is_some_and(is_ident) && !after.is_some_and(is_ident)
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        input::InputClass,
        test::{parse, parse_files, with_vertex_stage, MATERIAL_PROGRAM, ROOT_FILE},
    };

    fn parse_err(source: &str) -> ParseError {
        parse(source).unwrap_err()
    }

    #[test_log::test]
    fn parses_the_material_program() {
        let program = parse(MATERIAL_PROGRAM).unwrap();

        let mutators: Vec<_> = program
            .mutators()
            .iter()
            .map(|mutator| (mutator.name(), mutator.values().to_vec()))
            .collect();
        assert_eq!(
            mutators,
            [("LOD", vec![0, 1, 2]), ("DIFFUSE_TEX", vec![0, 1])]
        );

        let [rewrite] = program.rewrites() else {
            panic!("expected one rewrite");
        };
        assert_eq!(
            rewrite.records(),
            [
                RewriteRecord {
                    mutator_index: 0,
                    value_from: 2,
                    value_to: 2
                },
                RewriteRecord {
                    mutator_index: 1,
                    value_from: 1,
                    value_to: 0
                }
            ]
        );

        let inputs: Vec<_> = program
            .inputs()
            .iter()
            .map(|input| (input.name(), input.index(), input.class(), input.binding()))
            .collect();
        assert_eq!(
            inputs,
            [
                ("u_mvp", 0, InputClass::UniformBlock, None),
                ("u_diffuse", 1, InputClass::Texture, Some(1)),
                ("u_sampler", 2, InputClass::Sampler, Some(2)),
            ]
        );
        assert_eq!(
            program.shader_types(),
            ShaderTypes::VERTEX | ShaderTypes::FRAGMENT
        );
        assert_eq!(program.descriptor_set(), 0);
    }

    #[test_log::test]
    fn input_pragmas_are_replaced_by_their_declaration() {
        let program = parse(MATERIAL_PROGRAM).unwrap();
        assert!(program
            .globals
            .contains("#define _ANKI_INPUT_SITE_u_mvp\n#define u_mvp _anki_unis._m_u_mvp\n"));
        assert!(program.globals.contains(
            "layout(set = _ANKI_DESCRIPTOR_SET, binding = _ANKI_BINDING_u_diffuse) uniform texture2D u_diffuse;"
        ));
        assert!(!program.globals.contains("#pragma anki"));
        assert_eq!(
            program.uniform_block_members,
            "#if defined(_ANKI_ACTIVATE_INPUT_u_mvp)\n\tmat4 _m_u_mvp;\n#endif\n"
        );
        assert!(program
            .stage_code(ShaderType::Fragment)
            .contains("layout(location = 0) out Vec4 out_color;"));
        assert!(!program.stage_code(ShaderType::Vertex).contains("out_color"));
    }

    #[test_log::test]
    fn bindings_start_at_zero_without_uniform_block_inputs() {
        let program = parse(&with_vertex_stage(
            "#pragma anki input sampler u_sampler\n#pragma anki input textureCube u_env",
        ))
        .unwrap();
        let bindings: Vec<_> = program.inputs().iter().map(Input::binding).collect();
        assert_eq!(bindings, [Some(0), Some(1)]);
    }

    #[test_log::test]
    fn spec_constant_ids_advance_by_component_count() {
        let program = parse(&with_vertex_stage(
            "#pragma anki input const Vec3 u_color\n\
             #pragma anki input const U32 u_count\n\
             #pragma anki input const ivec2 u_size",
        ))
        .unwrap();
        let ids: Vec<_> = program
            .inputs()
            .iter()
            .map(Input::spec_constant_id)
            .collect();
        assert_eq!(ids, [Some(0), Some(3), Some(4)]);
        assert!(program
            .globals
            .contains("ANKI_SPECIALIZATION_CONSTANT_VEC3(u_color, 0);"));
        assert!(program
            .globals
            .contains("ANKI_SPECIALIZATION_CONSTANT_IVEC2(u_size, 4);"));
    }

    #[test_log::test]
    fn instanced_inputs_are_sized_by_the_instance_count_mutator() {
        let program = parse(&with_vertex_stage(
            "#pragma anki mutator instanced INSTANCE_COUNT 1 2 4\n\
             #pragma anki input instanced Mat4 u_mvp",
        ))
        .unwrap();
        assert_eq!(
            program.instance_count_mutator().map(Mutator::name),
            Some("INSTANCE_COUNT")
        );
        assert!(program.inputs().first().is_some_and(Input::is_instanced));
        assert!(program
            .uniform_block_members
            .contains("\tmat4 _m_u_mvp[INSTANCE_COUNT];\n"));
    }

    #[test_log::test]
    fn pragma_once_files_contribute_once() {
        let program = parse_files(
            ROOT_FILE,
            &[
                (
                    ROOT_FILE,
                    "#include \"common.glsl\"\n#include <common.glsl>\n\
                     #pragma anki start comp\nvoid main() {}\n#pragma anki end\n",
                ),
                (
                    "common.glsl",
                    "#pragma once\n#include \"common.glsl\"\n\
                     #pragma anki input Vec4 u_color\nfloat helper() { return 1.0; }\n",
                ),
            ],
        )
        .unwrap();
        assert_eq!(program.inputs().len(), 1);
        assert_eq!(program.globals.matches("float helper()").count(), 1);
    }

    #[test_log::test]
    fn files_without_pragma_once_are_included_every_time() {
        let program = parse_files(
            ROOT_FILE,
            &[
                (
                    ROOT_FILE,
                    "#include \"part.glsl\"\n#pragma anki start comp\n#include \"part.glsl\"\n#pragma anki end\n",
                ),
                ("part.glsl", "#define PART 1\n"),
            ],
        )
        .unwrap();
        assert_eq!(program.globals, "#define PART 1\n");
        assert_eq!(program.stage_code(ShaderType::Compute), "#define PART 1\n");
    }

    #[test_log::test]
    fn duplicate_pragma_once_is_an_error() {
        let err = parse_err("#pragma once\n\n#pragma once\n");
        assert!(matches!(err.kind, ParseErrorKind::DuplicatePragmaOnce));
        assert_eq!((err.file.as_str(), err.line), (ROOT_FILE, 3));
    }

    /// Builds a chain where the root includes `d1.glsl`, which includes `d2.glsl`, and so on.
    fn include_chain(length: usize) -> Vec<(String, String)> {
        let mut files = vec![(
            ROOT_FILE.to_owned(),
            "#include \"d1.glsl\"\n#pragma anki start comp\n#pragma anki end\n".to_owned(),
        )];
        for depth in 1..=length {
            let text = if depth == length {
                String::new()
            } else {
                format!("#include \"d{}.glsl\"\n", depth + 1)
            };
            files.push((format!("d{depth}.glsl"), text));
        }
        files
    }

    fn parse_chain(length: usize) -> Result<ShaderProgram, ParseError> {
        let chain = include_chain(length);
        let entries: Vec<(&str, &str)> = chain
            .iter()
            .map(|(name, text)| (name.as_str(), text.as_str()))
            .collect();
        parse_files(ROOT_FILE, &entries)
    }

    #[test_log::test]
    fn includes_nest_up_to_eight_levels() {
        parse_chain(8).unwrap();

        let err = parse_chain(9).unwrap_err();
        assert!(matches!(
            err.kind,
            ParseErrorKind::IncludeTooDeep { ref name, max_depth: 8 } if name == "d9.glsl"
        ));
        assert_eq!((err.file.as_str(), err.line), ("d8.glsl", 1));
    }

    #[test_log::test]
    fn missing_includes_point_at_the_including_line() {
        let err = parse_files(
            ROOT_FILE,
            &[(ROOT_FILE, "// header\n#include \"missing.glsl\"\n")],
        )
        .unwrap_err();
        assert!(matches!(
            err.kind,
            ParseErrorKind::IncludeNotFound { ref name, .. } if name == "missing.glsl"
        ));
        assert_eq!((err.file.as_str(), err.line), (ROOT_FILE, 2));
    }

    #[test_log::test]
    fn missing_root_file_is_reported_at_line_zero() {
        let err = parse_files("absent.glslp", &[]).unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::IncludeNotFound { .. }));
        assert_eq!((err.file.as_str(), err.line), ("absent.glslp", 0));
    }

    #[test_log::test]
    fn malformed_includes() {
        let err = parse_err("#include common.glsl\n");
        assert!(matches!(err.kind, ParseErrorKind::MalformedPragma(_)));
    }

    #[test_log::test]
    fn mutator_errors() {
        let cases = [
            "#pragma anki mutator A 0\n#pragma anki mutator A 1",
            "#pragma anki mutator A",
            "#pragma anki mutator A 0 x",
            "#pragma anki mutator A 1 1",
            "#pragma anki mutator A 2 1",
            "#pragma anki mutator instanced A 0 1",
            "#pragma anki mutator instanced A 1\n#pragma anki mutator instanced B 2",
        ];
        let kinds: Vec<_> = cases
            .iter()
            .map(|source| parse_err(&with_vertex_stage(source)).kind)
            .collect();
        assert!(matches!(kinds[0], ParseErrorKind::DuplicateMutatorName(ref name) if name == "A"));
        for kind in &kinds[1..6] {
            assert!(
                matches!(kind, ParseErrorKind::InvalidMutatorValues { .. }),
                "{kind:?}"
            );
        }
        assert!(matches!(
            kinds[6],
            ParseErrorKind::DuplicateInstanceCountMutator { ref name, ref previous }
                if name == "B" && previous == "A"
        ));
    }

    #[test_log::test]
    fn rewrite_rule_errors() {
        let mutators = "#pragma anki mutator A 0 1\n#pragma anki mutator B 0 1\n";
        let cases = [
            "A 1 B 1 A 1 B 0",
            "A 1 B 1 to A 1",
            "A 1 B 1 to A 1 C 0",
            "A 1 B to A 1 B 0",
            "A 1 B 1 to A 1 B 1",
            "A 2 to A 0",
            "A 1 A 0 to A 0 A 1",
            "to",
            "A 1 to A 0 to A 1",
            "A x to A 0",
        ];
        for case in cases {
            let source = format!("{mutators}#pragma anki rewrite_mutation {case}");
            let err = parse_err(&with_vertex_stage(&source));
            assert!(
                matches!(err.kind, ParseErrorKind::MalformedRewriteRule(_)),
                "`{case}` gave {err}"
            );
            assert_eq!(err.line, 3);
        }

        let source = format!("{mutators}#pragma anki rewrite_mutation B 1 A 1 to A 0 B 1");
        let program = parse(&with_vertex_stage(&source)).unwrap();
        let records = program.rewrites().first().unwrap().records();
        assert_eq!(records.first().unwrap().mutator_index, 0);
        assert_eq!(records.first().unwrap().value_to, 0);
    }

    #[test_log::test]
    fn input_errors() {
        let err = parse_err(&with_vertex_stage(
            "#pragma anki input Vec4 a\n#pragma anki input F32 a",
        ));
        assert!(matches!(err.kind, ParseErrorKind::DuplicateInputName(ref name) if name == "a"));
        assert_eq!(err.line, 2);

        let err = parse_err(&with_vertex_stage("#pragma anki input Vec5 a"));
        assert!(matches!(err.kind, ParseErrorKind::UnknownInputType(ref ty) if ty == "Vec5"));

        let conflicts = [
            "#pragma anki mutator instanced N 1\n#pragma anki input const instanced Vec4 a",
            "#pragma anki mutator instanced N 1\n#pragma anki input instanced texture2D a",
            "#pragma anki input const sampler a",
            "#pragma anki input const Mat4 a",
            "#pragma anki input instanced Vec4 a",
        ];
        for source in conflicts {
            let err = parse_err(&with_vertex_stage(source));
            assert!(
                matches!(err.kind, ParseErrorKind::ConflictingInputQualifiers { .. }),
                "{err}"
            );
        }

        for source in [
            "#pragma anki input Vec4",
            "#pragma anki input const const F32 a",
            "#pragma anki input Vec4 a b",
            "#pragma anki input Vec4 1a",
        ] {
            let err = parse_err(&with_vertex_stage(source));
            assert!(matches!(err.kind, ParseErrorKind::MalformedPragma(_)), "{err}");
        }
    }

    #[test_log::test]
    fn too_many_inputs() {
        let declarations: String = (0..=MAX_INPUTS)
            .map(|idx| format!("#pragma anki input F32 u_{idx}\n"))
            .collect();
        let err = parse_err(&with_vertex_stage(&declarations));
        assert!(matches!(err.kind, ParseErrorKind::TooManyInputs { max: 128 }));
        assert_eq!(err.line, MAX_INPUTS + 1);
    }

    #[test_log::test]
    fn stage_nesting_errors() {
        let cases = [
            ("#pragma anki start vert\n#pragma anki start frag\n", 2),
            ("#pragma anki end\n", 1),
            (
                "#pragma anki start vert\n#pragma anki end\n#pragma anki start vert\n#pragma anki end\n",
                3,
            ),
            (
                "#pragma anki start vert\n#pragma anki end\n#pragma anki start comp\n#pragma anki end\n",
                3,
            ),
            (
                "#pragma anki start comp\n#pragma anki end\n#pragma anki start frag\n#pragma anki end\n",
                3,
            ),
            ("\n#pragma anki start frag\nvoid main() {}\n", 2),
        ];
        for (source, line) in cases {
            let err = parse_err(source);
            assert!(
                matches!(err.kind, ParseErrorKind::StageNestingError(_)),
                "{err}"
            );
            assert_eq!(err.line, line, "{err}");
        }
    }

    #[test_log::test]
    fn descriptor_set() {
        let program = parse(&with_vertex_stage(
            "#pragma anki descriptor_set 2\n#pragma anki descriptor_set 2",
        ))
        .unwrap();
        assert_eq!(program.descriptor_set(), 2);

        let err = parse_err(&with_vertex_stage(
            "#pragma anki descriptor_set 2\n#pragma anki descriptor_set 1",
        ));
        assert!(matches!(
            err.kind,
            ParseErrorKind::DescriptorSetRedeclared {
                previous: 2,
                new: 1
            }
        ));

        let err = parse_err(&with_vertex_stage("#pragma anki descriptor_set -1"));
        assert!(matches!(err.kind, ParseErrorKind::MalformedPragma(_)));
    }

    #[test_log::test]
    fn malformed_pragmas() {
        for source in [
            "#pragma anki",
            "#pragma anki frobnicate",
            "#pragma anki start",
            "#pragma anki start pixel",
            "#pragma anki start vert frag",
            "#pragma once now",
        ] {
            let err = parse_err(source);
            assert!(matches!(err.kind, ParseErrorKind::MalformedPragma(_)), "{err}");
            assert_eq!(err.line, 1);
        }
    }

    #[test_log::test]
    fn other_pragmas_and_comments_pass_through() {
        let program = parse(
            "#pragma optimize(off)\n\
             #pragma anki start comp // compute only\n\
             #pragma anki end /* done */\n",
        )
        .unwrap();
        assert_eq!(program.globals, "#pragma optimize(off)\n");
        assert_eq!(program.shader_types(), ShaderTypes::COMPUTE);
    }

    #[test_log::test]
    fn no_shader_stages() {
        let err = parse_err("#pragma anki mutator A 0\nvoid f() {}\n");
        assert!(matches!(err.kind, ParseErrorKind::NoShaderStages));
        assert_eq!((err.file.as_str(), err.line), (ROOT_FILE, 2));
    }

    #[test_log::test]
    fn word_matching() {
        assert!(contains_word("#if LOD == 1", "LOD"));
        assert!(!contains_word("#if LOD_BIAS == 1", "LOD"));
        assert!(!contains_word("MY_LOD", "LOD"));
    }
}
