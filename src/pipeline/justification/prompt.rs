use super::types::{PromptMessage, Role};

pub const JUSTIFICATION_SYSTEM_PROMPT: &str = "Você é um profissional de saúde solicitando a \
realização de um procedimento para seu paciente. Sempre retorne JSON válido, sem qualquer texto \
adicional fora do JSON.";

/// Build the user instruction for one justification request.
pub fn build_justification_prompt(procedure: &str, clinical_text: &str, requirements: &str) -> String {
    format!(
        r#"Sua tarefa é redigir a JUSTIFICATIVA CLÍNICA fundamentada nas informações clínicas e nos critérios da nota técnica.

A saída deve ser EXCLUSIVAMENTE em JSON válido, no seguinte formato:

{{
  "procedimento": "<nome do procedimento>",
  "justificativa": "<texto clínico conciso estruturado em 2 a 3 parágrafos, escrito na perspectiva do profissional solicitante>"
}}

REGRAS:
- Escreva a justificativa como se fosse o médico/profissional solicitante.
- Use tom clínico-profissional, claro, objetivo e fundamentado.
- Inicie a justificativa com uma frase que CITE A NOTA TÉCNICA (EXEMPLO: 'Caro(a) colega regulador(a),
Encaminho a presente solicitação de procedimento, elaborada conforme os requisitos formais estabelecidos
na Nota Técnica X.').
- Embase o texto nas informações clínicas e PRINCIPALMENTE nos critérios da nota técnica. Alinhando SEMPRE as
informações clínicas do paciente com o requisito da nota técnica.
- Apresente na justificativa TODOS os dados clínicos do paciente informados.
- Quando um dado clínico do paciente atender ao critério apresentado, mencione isso na justificativa. CASO NÃO ATENDA, IGNORE.
- NÃO inclua texto fora do JSON, comentários ou explicações adicionais.

DADOS:
- Procedimento: <<{procedure}>>
- Informações clínicas: <<{clinical_text}>>
- Critérios da nota técnica: <<{requirements}>>
"#
    )
}

/// System instruction followed by the user instruction, in that order.
pub fn build_messages(procedure: &str, clinical_text: &str, requirements: &str) -> Vec<PromptMessage> {
    vec![
        PromptMessage {
            role: Role::System,
            content: JUSTIFICATION_SYSTEM_PROMPT.to_string(),
        },
        PromptMessage {
            role: Role::User,
            content: build_justification_prompt(procedure, clinical_text, requirements),
        },
    ]
}
