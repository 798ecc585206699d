//! Demo data for an empty store.

use crate::{
  generate::{Generator, TemplateGenerator},
  record::{NewRecord, Urgency, now_seconds},
  store::RecordStore,
};

/// (machine, problem, urgency) of each sample submission.
pub const SAMPLES: [(&str, &str, Urgency); 10] = [
  ("Bobinadeira 01", "Ruído intermitente no motor principal", Urgency::High),
  ("Bobinadeira 02", "Oscilação na tensão da bobina", Urgency::Medium),
  ("Prensa Hidráulica A", "Vazamento leve no circuito", Urgency::Medium),
  ("Prensa Hidráulica B", "Queda súbita de pressão", Urgency::High),
  ("Esteira 3", "Desalinhamento lateral recorrente", Urgency::Low),
  ("Esteira 4", "Paradas curtas sem motivo aparente", Urgency::Medium),
  ("Forno Térmico 1", "Aquecimento abaixo do setpoint", Urgency::High),
  ("Compressor Z9", "Vibração excessiva na base", Urgency::Medium),
  ("Misturador M5", "Aumento de temperatura no rolamento", Urgency::High),
  ("Bobinadeira 01", "Desgaste anormal da correia", Urgency::Low),
];

/// Insert [`SAMPLES`] with template diagnoses, but only into an empty store.
/// Returns the number of rows written.
pub async fn seed_if_empty<S: RecordStore>(store: &S) -> Result<usize, S::Error> {
  if store.count().await? > 0 {
    return Ok(0);
  }

  let created_at = now_seconds();
  let mut records = Vec::with_capacity(SAMPLES.len());
  for (machine, problem, urgency) in SAMPLES {
    let generation = TemplateGenerator.generate(machine, problem).await;
    records.push(NewRecord {
      machine: machine.to_owned(),
      problem: problem.to_owned(),
      diagnosis: generation.text.clone(),
      urgency,
      created_at,
      generated_by: Some(generation.generated_by()),
    });
  }

  // Another writer may have filled the store since the count above.
  let inserted = store.append_all_if_empty(records).await?.len();
  if inserted > 0 {
    tracing::info!(rows = inserted, "seeded sample diagnoses");
  }
  Ok(inserted)
}
