//! Diagnosis stage: prompt assembly and the contingency report

use super::knowledge::KnowledgeBundle;
use super::types::{CaseInput, Urgency};

/// System framing for the clinical reasoning request
pub const SYSTEM_PROMPT: &str = "És um veterinário especialista em diagnóstico.";

/// Local document excerpts embedded in the prompt
const MAX_PROMPT_DOCUMENTS: usize = 3;

/// Build the structured differential-diagnosis prompt
pub fn build_prompt(case: &CaseInput, visual_analysis: &str, knowledge: &KnowledgeBundle) -> String {
    let doc_context = knowledge
        .local_documents
        .iter()
        .take(MAX_PROMPT_DOCUMENTS)
        .map(|d| format!("[Documento: {}]\n{}", d.source, d.content))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "És um veterinário experiente a realizar um diagnóstico diferencial.\n\n\
         ## INFORMAÇÃO DO CASO\n\n\
         ### Dados do Animal:\n\
         - Espécie: {species}\n\
         - Raça: {breed}\n\
         - Idade: {age}\n\
         - Peso: {weight}\n\
         - Histórico médico: {history}\n\n\
         ### Sintomas Reportados pelo Tutor:\n\
         {symptoms}\n\n\
         ### Análise Visual das Imagens:\n\
         {visual}\n\n\
         ### Informação de Referência (Literatura e Web):\n\
         {docs}\n\n\
         {web}\n\n\
         ---\n\n\
         ## TAREFA\n\n\
         Com base em toda a informação, fornece:\n\n\
         ### 1. DIAGNÓSTICOS DIFERENCIAIS\n\
         Lista os 3-5 diagnósticos mais prováveis, ordenados por probabilidade:\n\
         - Para cada um: nome, probabilidade estimada (%), justificação\n\n\
         ### 2. EXAMES RECOMENDADOS\n\
         Que exames/testes confirmariam o diagnóstico:\n\
         - Análises laboratoriais\n\
         - Imagiologia\n\
         - Outros testes\n\n\
         ### 3. TRATAMENTO INICIAL\n\
         Sugestões de tratamento/manejo enquanto não há diagnóstico definitivo:\n\
         - Cuidados imediatos\n\
         - Medicação sintomática (se aplicável)\n\
         - O que NÃO fazer\n\n\
         ### 4. NÍVEL DE URGÊNCIA\n\
         Classifica: Rotina | Consulta em 24-48h | Urgente | Emergência\n\n\
         ### 5. PRÓXIMOS PASSOS\n\
         Recomendações claras para o tutor\n\n\
         ### 6. DISCLAIMER\n\
         Lembra que isto é uma orientação e não substitui consulta presencial.\n\n\
         ---\n\
         Raciocina passo a passo antes de concluir.",
        species = case.species,
        breed = case.breed,
        age = case.age,
        weight = case.weight,
        history = if case.history.is_empty() {
            "Não disponível"
        } else {
            &case.history
        },
        symptoms = case.symptoms,
        visual = visual_analysis,
        docs = doc_context,
        web = knowledge.web_summary,
    )
}

/// Deterministic contingency report substituted when the generative chain
/// fails. Always renders; explicitly labeled and pointing to in-person care.
pub fn fallback_report(case: &CaseInput) -> String {
    let urgency_banner = if case.urgency == Urgency::Urgent {
        "\n**CASO MARCADO COMO URGENTE**\n\
         Recomenda-se procurar atendimento veterinário imediato.\n"
    } else {
        ""
    };

    format!(
        "## Diagnóstico de Contingência\n\n\
         Devido a limitações técnicas temporárias, não foi possível gerar um diagnóstico detalhado.\n\n\
         ### Dados do Caso\n\
         - **Animal:** {species} ({breed})\n\
         - **Idade:** {age} | **Peso:** {weight}\n\n\
         ### Sintomas Reportados\n\
         {symptoms}\n\
         {banner}\n\
         ### Recomendações Gerais\n\n\
         1. **Consulte um médico veterinário presencialmente**\n\
         2. Mantenha o animal em observação\n\
         3. Registe qualquer alteração nos sintomas\n\
         4. Garanta hidratação e conforto\n\
         5. Não administre medicação sem orientação profissional\n\n\
         ---\n\
         *Este é um diagnóstico de contingência. Consulte sempre um profissional veterinário.*",
        species = case.species,
        breed = case.breed,
        age = case.age,
        weight = case.weight,
        symptoms = case.symptoms,
        banner = urgency_banner,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::RetrievalResult;
    use std::collections::HashMap;

    #[test]
    fn test_prompt_embeds_at_most_three_documents() {
        let case = CaseInput::new("Cão", "vómito");
        let knowledge = KnowledgeBundle {
            local_documents: (0..5)
                .map(|i| RetrievalResult {
                    content: format!("excerpt {}", i),
                    source: format!("doc{}.pdf", i),
                    page: None,
                    score: 0.9,
                    metadata: HashMap::new(),
                })
                .collect(),
            ..Default::default()
        };

        let prompt = build_prompt(&case, "sem alterações", &knowledge);
        assert!(prompt.contains("excerpt 0"));
        assert!(prompt.contains("excerpt 2"));
        assert!(!prompt.contains("excerpt 3"));
    }

    #[test]
    fn test_fallback_report_is_labeled_contingency() {
        let case = CaseInput::new("Cão", "vómito e diarreia");
        let report = fallback_report(&case);
        assert!(report.contains("Diagnóstico de Contingência"));
        assert!(report.contains("vómito e diarreia"));
        assert!(report.contains("Consulte um médico veterinário presencialmente"));
        assert!(!report.contains("CASO MARCADO COMO URGENTE"));
    }

    #[test]
    fn test_fallback_report_urgent_banner() {
        let mut case = CaseInput::new("Gato", "convulsões");
        case.urgency = Urgency::Urgent;
        let report = fallback_report(&case);
        assert!(report.contains("CASO MARCADO COMO URGENTE"));
    }
}
