use tower_lsp::lsp_types::{
    SemanticToken, SemanticTokenModifier, SemanticTokenType, SemanticTokensLegend,
};

use crate::helpers::LineIndex;
use crate::index::Index;
use crate::lexer::{Token, TokenKind, tokenize};

// Indices into the legend returned by `legend()`
const TOKEN_TYPE_FUNCTION: u32 = 0;
const TOKEN_TYPE_CLASS: u32 = 1;
const TOKEN_TYPE_ENUM: u32 = 2;
const TOKEN_TYPE_METHOD: u32 = 3;
const TOKEN_TYPE_ENUM_MEMBER: u32 = 4;
const TOKEN_TYPE_VARIABLE: u32 = 5;
const TOKEN_TYPE_NUMBER: u32 = 6;
const TOKEN_TYPE_STRING: u32 = 7;
const TOKEN_TYPE_OPERATOR: u32 = 8;
const TOKEN_TYPE_LABEL: u32 = 9;

const MODIFIER_DECLARATION: u32 = 1 << 0;
const MODIFIER_READONLY: u32 = 1 << 1;
const MODIFIER_DEPRECATED: u32 = 1 << 2;

pub fn legend() -> SemanticTokensLegend {
    SemanticTokensLegend {
        token_types: vec![
            SemanticTokenType::FUNCTION,
            SemanticTokenType::CLASS,
            SemanticTokenType::ENUM,
            SemanticTokenType::METHOD,
            SemanticTokenType::ENUM_MEMBER,
            SemanticTokenType::VARIABLE,
            SemanticTokenType::NUMBER,
            SemanticTokenType::STRING,
            SemanticTokenType::OPERATOR,
            SemanticTokenType::new("label"),
        ],
        token_modifiers: vec![
            SemanticTokenModifier::DECLARATION,
            SemanticTokenModifier::READONLY,
            SemanticTokenModifier::DEPRECATED,
        ],
    }
}

/// Classify `tokens[i]`, looking one or two tokens back for `Owner.Member`
/// and one token ahead for `Owner.`.
fn classify(index: &Index, tokens: &[Token], i: usize) -> Option<(u32, u32)> {
    let token = &tokens[i];
    match token.kind {
        TokenKind::Identifier => {
            let after_dot = i >= 2 && tokens[i - 1].kind == TokenKind::Dot;
            if after_dot {
                let owner = &tokens[i - 2];
                if owner.kind != TokenKind::Identifier {
                    return None;
                }
                if let Some(command) = index.class_member(&owner.text, &token.text) {
                    let modifiers = if command.is_unsupported {
                        MODIFIER_DEPRECATED
                    } else {
                        0
                    };
                    return Some((TOKEN_TYPE_METHOD, modifiers));
                }
                return index
                    .enum_member(&owner.text, &token.text)
                    .map(|_| (TOKEN_TYPE_ENUM_MEMBER, MODIFIER_READONLY));
            }

            let before_dot = tokens.get(i + 1).is_some_and(|t| t.kind == TokenKind::Dot);
            if before_dot && index.class_members(&token.text).is_some() {
                return Some((TOKEN_TYPE_CLASS, 0));
            }
            if before_dot && index.enum_by_name(&token.text).is_some() {
                return Some((TOKEN_TYPE_ENUM, 0));
            }

            index.opcode(&token.text).map(|command| {
                let modifiers = if command.is_unsupported {
                    MODIFIER_DEPRECATED
                } else {
                    0
                };
                (TOKEN_TYPE_FUNCTION, modifiers)
            })
        },
        TokenKind::LabelDefine => Some((TOKEN_TYPE_LABEL, MODIFIER_DECLARATION)),
        TokenKind::LabelJump => Some((TOKEN_TYPE_LABEL, 0)),
        TokenKind::GlobalVar | TokenKind::LocalVar => Some((TOKEN_TYPE_VARIABLE, 0)),
        TokenKind::Number | TokenKind::Float | TokenKind::ArraySize => {
            Some((TOKEN_TYPE_NUMBER, 0))
        },
        TokenKind::String => Some((TOKEN_TYPE_STRING, 0)),
        TokenKind::Equals
        | TokenKind::EqualEqual
        | TokenKind::PlusEquals
        | TokenKind::MinusEquals => Some((TOKEN_TYPE_OPERATOR, 0)),
        _ => None,
    }
}

pub fn compute_semantic_tokens(text: &str, index: &Index) -> Vec<SemanticToken> {
    let tokens = tokenize(text);
    let lines = LineIndex::new(text);

    // Convert to LSP semantic tokens (delta-encoded)
    let mut semantic_tokens = Vec::new();
    let mut prev_line = 0u32;
    let mut prev_col = 0u32;

    for (i, token) in tokens.iter().enumerate() {
        let Some((token_type, modifiers)) = classify(index, &tokens, i) else {
            continue;
        };
        let range = lines.token_range(token);
        let start = range.start;

        let delta_line = start.line - prev_line;
        let delta_start = if delta_line == 0 {
            start.character - prev_col
        } else {
            start.character
        };

        semantic_tokens.push(SemanticToken {
            delta_line,
            delta_start,
            length: range.end.character - start.character,
            token_type,
            token_modifiers_bitset: modifiers,
        });

        prev_line = start.line;
        prev_col = start.character;
    }

    semantic_tokens
}
