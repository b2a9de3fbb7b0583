//! The DMFY universal script, shipped as a flow.
//!
//! Answers every tenant that has not published a flow of its own.  The
//! script is stateless: a single node re-evaluates the same keyword rules
//! on every message and never transitions.

use crate::compile::CompiledFlow;
use crate::definition::{FlowDefinition, MatchRule, Node};

pub const BUILTIN_FLOW_ID: &str = "dmfy-universal-v1";
pub const BUILTIN_NODE_ID: &str = "dmfy";

/// Definition of the built-in flow.
pub fn builtin_definition() -> FlowDefinition {
    let node = Node::new(BUILTIN_NODE_ID)
        .rule(
            MatchRule::exact(["start", "oi", "ola", "olá", "/start", "dmfy"]).replying([
                "Fala! 👋 Eu sou o DMFY. Você quer vender (1) Mentoria, (2) Produto físico ou (3) Serviço?",
            ]),
        )
        .rule(MatchRule::contains(["1", "mentoria"]).replying([
            "Top! Mentoria: me diga seu ticket (ex.: 497/997/2000) e se você tem prova social (S/N).",
        ]))
        .rule(MatchRule::contains(["2", "produto"]).replying([
            "Beleza. Produto físico: qual nicho? (ex.: saúde/beleza) e qual o principal benefício?",
        ]))
        .rule(MatchRule::contains(["3", "serviço", "servico"]).replying([
            "Show. Serviço: qual? (ex.: tráfego, social media, design) e onde você atende?",
        ]))
        .rule(MatchRule::regex(r"(^|\s)(997|497|2000)(\s|$)").replying([
            "Perfeito. Vou te mostrar como fechamos isso nas DMs, passo a passo.",
            "Quer receber um roteiro otimizado e já agendar um diagnóstico? (S/N)",
        ]))
        .rule(MatchRule::exact(["s", "sim"]).replying([
            "Ótimo! Segue o passo: https://seu-checkout-ou-form.com",
            "Se quiser falar com um especialista agora, digite: humano",
        ]))
        .rule(MatchRule::contains(["humano"]).replying([
            "Um especialista foi acionado e vai te responder agora 😉",
        ]));

    FlowDefinition {
        id: BUILTIN_FLOW_ID.into(),
        name: "DMFY Universal Flow (v1)".into(),
        channel: None,
        version: "1".into(),
        nodes: vec![node],
        entry_node_id: BUILTIN_NODE_ID.into(),
        fallback: vec![
            "Beleza. Me dá mais um detalhe do que você vende e já te passo o melhor caminho."
                .into(),
        ],
    }
}

/// The built-in flow, compiled.
///
/// The definition is static and covered by the `definition_is_valid` test.
pub fn builtin_flow() -> CompiledFlow {
    CompiledFlow::compile(builtin_definition()).expect("built-in flow definition is valid")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::normalize;

    fn winner(text: &str) -> Option<usize> {
        builtin_flow().entry().first_match(&normalize(text))
    }

    #[test]
    fn definition_is_valid() {
        let result = CompiledFlow::compile(builtin_definition());
        assert!(result.is_ok(), "{:?}", result.err());
    }

    #[test]
    fn compiles() {
        let flow = builtin_flow();
        assert_eq!(flow.entry_node_id(), BUILTIN_NODE_ID);
        assert!(!flow.fallback().is_empty());
    }

    #[test]
    fn greeting_is_exact_only() {
        assert_eq!(winner("  Oi "), Some(0));
        assert_eq!(winner("/START"), Some(0));
        assert_eq!(winner("oi, quero ajuda"), None);
    }

    #[test]
    fn menu_keywords_in_order() {
        assert_eq!(winner("quero mentoria"), Some(1));
        assert_eq!(winner("produto"), Some(2));
        assert_eq!(winner("servico de design"), Some(3));
        // "1" in "12" wins before "2".
        assert_eq!(winner("12"), Some(1));
    }

    #[test]
    fn ticket_confirmation_and_handoff() {
        assert_eq!(winner("997"), Some(4));
        assert_eq!(winner("Sim"), Some(5));
        assert_eq!(winner("chama um humano"), Some(6));
        assert_eq!(winner("não sei"), None);
    }
}
