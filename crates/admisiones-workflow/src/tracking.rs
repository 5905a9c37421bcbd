use admisiones_domain::{Admission, Choice};
use historial::{ChangeValue, HistoryChange, Labelled};

/// Valor de una opción con su etiqueta visible.
pub fn labelled<C: Choice>(c: C) -> Labelled {
  Labelled::new(c.code(), c.display())
}

fn choice<C: Choice>(c: Option<C>) -> ChangeValue {
  c.map(|c| ChangeValue::Choice(labelled(c))).unwrap_or(ChangeValue::Empty)
}

/// Campos de la admisión cuyo cambio se registra como `FieldChange`, con su
/// etiqueta. El estado legal y el archivo se registran como cambios de
/// estado.
pub const TRACKED_FIELDS: &[(&str, &str)] = &[("enviado_legales", "Enviado a legales"),
                                              ("observaciones", "Observaciones"),
                                              ("intervencion_juridicos", "Intervención de jurídicos"),
                                              ("rechazo_juridicos_motivo", "Motivo de rechazo de jurídicos"),
                                              ("dictamen_motivo", "Motivo del dictamen"),
                                              ("informe_sga", "Informe SGA aceptado"),
                                              ("numero_convenio", "Número de convenio"),
                                              ("archivo_convenio", "Archivo de convenio"),
                                              ("complementario_solicitado", "Complementario solicitado")];

fn tracked_values(a: &Admission) -> [ChangeValue; 9] {
  [ChangeValue::Flag(a.sent_to_legal),
   ChangeValue::text(a.rectification_observations.as_deref()),
   choice(a.legal_intervention),
   choice(a.rejection_motive),
   choice(a.dictamen_detail),
   ChangeValue::Flag(a.sga_report_accepted),
   ChangeValue::text(a.convenio_number.as_deref()),
   ChangeValue::text(a.convenio_file.as_ref().map(|f| f.as_str())),
   ChangeValue::Flag(a.complementary_requested)]
}

/// Un `FieldChange` por cada campo seguido que difiere entre `before` y
/// `after`, en el orden de `TRACKED_FIELDS`.
pub fn diff(before: &Admission, after: &Admission) -> Vec<HistoryChange> {
  tracked_values(before).into_iter()
                        .zip(tracked_values(after))
                        .zip(TRACKED_FIELDS)
                        .filter(|((b, a), _)| b != a)
                        .map(|((before, after), (field, label))| HistoryChange::FieldChange { field: field.to_string(),
                                                                                              label: label.to_string(),
                                                                                              before,
                                                                                              after })
                        .collect()
}
