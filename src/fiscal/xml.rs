use std::io::Cursor;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use rust_decimal::Decimal;

use super::document::*;
use crate::core::FacturaError;

/// Namespace of the electronic tax document.
pub const DTE_NAMESPACE: &str = "http://www.sat.gob.sv/face";
const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
const SCHEMA_LOCATION: &str = "http://www.sat.gob.sv/face DTE.xsd";

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";

fn xml_io(e: std::io::Error) -> FacturaError {
    FacturaError::Xml(format!("write error: {e}"))
}

pub(crate) struct XmlWriter {
    writer: Writer<Cursor<Vec<u8>>>,
}

impl XmlWriter {
    pub(crate) fn new() -> Result<Self, FacturaError> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(xml_io)?;
        Ok(Self { writer })
    }

    pub(crate) fn into_string(self) -> Result<String, FacturaError> {
        let buf = self.writer.into_inner().into_inner();
        String::from_utf8(buf).map_err(|e| FacturaError::Xml(format!("UTF-8 error: {e}")))
    }

    pub(crate) fn start_element(&mut self, name: &str) -> Result<&mut Self, FacturaError> {
        self.writer
            .write_event(Event::Start(BytesStart::new(name)))
            .map_err(xml_io)?;
        Ok(self)
    }

    pub(crate) fn start_element_with_attrs(
        &mut self,
        name: &str,
        attrs: &[(&str, &str)],
    ) -> Result<&mut Self, FacturaError> {
        let mut elem = BytesStart::new(name);
        for (k, v) in attrs {
            elem.push_attribute((*k, *v));
        }
        self.writer
            .write_event(Event::Start(elem))
            .map_err(xml_io)?;
        Ok(self)
    }

    pub(crate) fn end_element(&mut self, name: &str) -> Result<&mut Self, FacturaError> {
        self.writer
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(xml_io)?;
        Ok(self)
    }

    pub(crate) fn text_element(&mut self, name: &str, text: &str) -> Result<&mut Self, FacturaError> {
        self.start_element(name)?;
        self.writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(xml_io)?;
        self.end_element(name)
    }

    /// Write the element only when a value is present.
    pub(crate) fn optional_element(
        &mut self,
        name: &str,
        text: Option<&str>,
    ) -> Result<&mut Self, FacturaError> {
        match text {
            Some(t) => self.text_element(name, t),
            None => Ok(self),
        }
    }

    pub(crate) fn amount_element(
        &mut self,
        name: &str,
        amount: Decimal,
    ) -> Result<&mut Self, FacturaError> {
        self.text_element(name, &format_decimal(amount))
    }
}

/// Format a Decimal for XML output: at least 2 decimal places, trailing
/// zeros beyond that stripped.
pub fn format_decimal(d: Decimal) -> String {
    let s = d.normalize().to_string();
    if let Some(dot_pos) = s.find('.') {
        let decimals = s.len() - dot_pos - 1;
        if decimals < 2 {
            format!("{s}{}", "0".repeat(2 - decimals))
        } else {
            s
        }
    } else {
        format!("{s}.00")
    }
}

/// Serialize a fiscal document to XML.
///
/// Output is deterministic: element order follows the document structure
/// and optional values are omitted when absent.
pub fn to_xml(doc: &FiscalDocument) -> Result<String, FacturaError> {
    let mut w = XmlWriter::new()?;

    w.start_element_with_attrs(
        "DTE",
        &[
            ("xmlns", DTE_NAMESPACE),
            ("xmlns:xsi", XSI_NAMESPACE),
            ("xsi:schemaLocation", SCHEMA_LOCATION),
        ],
    )?;

    let g = &doc.general;
    w.start_element("DatosGenerales")?;
    w.text_element("version", &g.version.to_string())?;
    w.text_element("ambiente", &g.environment)?;
    w.text_element("tipoDte", &g.document_type)?;
    w.text_element("codigoGeneracion", &g.generation_code)?;
    w.text_element("tipoModelo", &g.model_type.to_string())?;
    w.text_element("tipoOperacion", &g.operation_type.to_string())?;
    w.text_element("fecEmi", &g.issue_date.format(DATE_FORMAT).to_string())?;
    w.text_element("horEmi", &g.issue_time.format(TIME_FORMAT).to_string())?;
    w.text_element("tipoMoneda", &g.currency)?;
    w.end_element("DatosGenerales")?;

    let i = &doc.issuer;
    w.start_element("DatosEmisor")?;
    w.text_element("nit", &i.nit)?;
    w.text_element("nrc", &i.nrc)?;
    w.text_element("nombre", &i.name)?;
    w.text_element("codActividad", &i.activity_code)?;
    w.text_element("descActividad", &i.activity_description)?;
    w.text_element("nombreComercial", &i.trade_name)?;
    w.text_element("tipoEstablecimiento", &i.establishment_type)?;
    write_address(&mut w, &i.address)?;
    w.optional_element("telefono", i.phone.as_deref())?;
    w.text_element("correo", &i.email)?;
    w.end_element("DatosEmisor")?;

    let r = &doc.recipient;
    w.start_element("DatosReceptor")?;
    w.optional_element("nit", r.nit.as_deref())?;
    w.optional_element("dui", r.dui.as_deref())?;
    w.text_element("nombre", &r.name)?;
    w.text_element("codActividad", &r.activity_code)?;
    write_address(&mut w, &r.address)?;
    w.optional_element("telefono", r.phone.as_deref())?;
    w.optional_element("correo", r.email.as_deref())?;
    w.end_element("DatosReceptor")?;

    w.start_element("CuerpoDocumento")?;
    for item in &doc.body {
        w.start_element_with_attrs("item", &[("numItem", &item.number.to_string())])?;
        w.text_element("codigo", &item.code)?;
        w.text_element("descripcion", &item.description)?;
        w.amount_element("cantidad", item.quantity)?;
        w.text_element("uniMedida", &item.unit)?;
        w.amount_element("precioUni", item.unit_price)?;
        w.amount_element("montoDescu", item.discount)?;
        w.amount_element("ventaNoSuj", item.non_subject_sale)?;
        w.amount_element("ventaExenta", item.exempt_sale)?;
        w.amount_element("ventaGravada", item.taxable_sale)?;
        if !item.taxes.is_empty() {
            w.start_element("tributos")?;
            for code in &item.taxes {
                w.text_element("tributo", code)?;
            }
            w.end_element("tributos")?;
        }
        w.end_element("item")?;
    }
    w.end_element("CuerpoDocumento")?;

    let s = &doc.summary;
    w.start_element("Resumen")?;
    w.amount_element("totalNoSuj", s.total_non_subject)?;
    w.amount_element("totalExenta", s.total_exempt)?;
    w.amount_element("totalGravada", s.total_taxable)?;
    w.amount_element("subTotalVentas", s.sales_subtotal)?;
    w.amount_element("descuGravada", s.taxable_discount)?;
    w.amount_element("porcentajeDescuento", s.discount_percentage)?;
    w.amount_element("totalDescu", s.total_discount)?;
    if !s.taxes.is_empty() {
        w.start_element("tributos")?;
        for tax in &s.taxes {
            w.start_element("tributo")?;
            w.text_element("codigo", &tax.code)?;
            w.text_element("descripcion", &tax.description)?;
            w.amount_element("valor", tax.amount)?;
            w.end_element("tributo")?;
        }
        w.end_element("tributos")?;
    }
    w.amount_element("subTotal", s.subtotal)?;
    w.amount_element("montoTotalOperacion", s.total_operation)?;
    w.amount_element("totalPagar", s.total_to_pay)?;
    w.text_element("totalLetras", &s.total_in_words)?;
    w.amount_element("totalIva", s.total_taxes)?;
    w.text_element("condicionOperacion", &s.operation_condition.to_string())?;
    w.start_element("pagos")?;
    for p in &s.payments {
        w.start_element("pago")?;
        w.text_element("codigo", &p.code)?;
        w.amount_element("montoPago", p.amount)?;
        w.text_element("referencia", &p.reference)?;
        w.optional_element("plazo", p.term.map(|t| t.to_string()).as_deref())?;
        w.optional_element("periodo", p.period.map(|t| t.to_string()).as_deref())?;
        w.end_element("pago")?;
    }
    w.end_element("pagos")?;
    w.end_element("Resumen")?;

    let e = &doc.extension;
    w.start_element("Extension")?;
    w.text_element("nombEntrega", &e.delivered_by_name)?;
    w.text_element("docuEntrega", &e.delivered_by_document)?;
    w.text_element("nombRecibe", &e.received_by_name)?;
    w.text_element("docuRecibe", &e.received_by_document)?;
    w.optional_element("observaciones", e.observations.as_deref())?;
    w.end_element("Extension")?;

    w.end_element("DTE")?;
    w.into_string()
}

fn write_address(w: &mut XmlWriter, address: &FiscalAddress) -> Result<(), FacturaError> {
    w.start_element("direccion")?;
    w.text_element("departamento", &address.department)?;
    w.text_element("municipio", &address.municipality)?;
    w.text_element("complemento", &address.complement)?;
    w.end_element("direccion")?;
    Ok(())
}

/// Parse a fiscal document produced by [`to_xml`].
pub fn from_xml(xml: &str) -> Result<FiscalDocument, FacturaError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut doc = ParsedDocument::default();
    let mut path: Vec<String> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let name = std::str::from_utf8(e.name().as_ref())
                    .unwrap_or("")
                    .to_string();

                if name == "item" && path.last().map(String::as_str) == Some("CuerpoDocumento") {
                    let mut item = ParsedItem::default();
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"numItem" {
                            item.number = Some(String::from_utf8_lossy(&attr.value).into_owned());
                        }
                    }
                    doc.current_item = Some(item);
                }
                if name == "tributo" && path.iter().any(|p| p == "Resumen") {
                    doc.current_tax = Some(ParsedSummaryTax::default());
                }
                if name == "pago" {
                    doc.current_payment = Some(ParsedPayment::default());
                }

                path.push(name);
            }
            Ok(Event::Text(ref e)) => {
                let text = e
                    .unescape()
                    .map_err(|e| FacturaError::Xml(format!("invalid text: {e}")))?
                    .to_string();
                if !text.is_empty() {
                    doc.handle_text(&path, text);
                }
            }
            Ok(Event::End(_)) => {
                let ended = path.pop().unwrap_or_default();
                match ended.as_str() {
                    "item" => {
                        if let Some(item) = doc.current_item.take() {
                            doc.items.push(item);
                        }
                    }
                    "tributo" => {
                        if let Some(tax) = doc.current_tax.take() {
                            doc.taxes.push(tax);
                        }
                    }
                    "pago" => {
                        if let Some(payment) = doc.current_payment.take() {
                            doc.payments.push(payment);
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(FacturaError::Xml(format!(
                    "parse error at position {}: {e}",
                    reader.error_position()
                )));
            }
            _ => {}
        }
    }

    doc.into_document()
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

#[derive(Default)]
struct ParsedAddress {
    department: Option<String>,
    municipality: Option<String>,
    complement: Option<String>,
}

impl ParsedAddress {
    fn set(&mut self, leaf: &str, text: String) {
        match leaf {
            "departamento" => self.department = Some(text),
            "municipio" => self.municipality = Some(text),
            "complemento" => self.complement = Some(text),
            _ => {}
        }
    }

    fn into_address(self) -> FiscalAddress {
        FiscalAddress {
            department: self.department.unwrap_or_default(),
            municipality: self.municipality.unwrap_or_default(),
            complement: self.complement.unwrap_or_default(),
        }
    }
}

#[derive(Default)]
struct ParsedItem {
    number: Option<String>,
    code: Option<String>,
    description: Option<String>,
    quantity: Option<String>,
    unit: Option<String>,
    unit_price: Option<String>,
    discount: Option<String>,
    non_subject_sale: Option<String>,
    exempt_sale: Option<String>,
    taxable_sale: Option<String>,
    taxes: Vec<String>,
}

#[derive(Default)]
struct ParsedSummaryTax {
    code: Option<String>,
    description: Option<String>,
    amount: Option<String>,
}

#[derive(Default)]
struct ParsedPayment {
    code: Option<String>,
    amount: Option<String>,
    reference: Option<String>,
    term: Option<String>,
    period: Option<String>,
}

#[derive(Default)]
struct ParsedDocument {
    // General data
    version: Option<String>,
    environment: Option<String>,
    document_type: Option<String>,
    generation_code: Option<String>,
    model_type: Option<String>,
    operation_type: Option<String>,
    issue_date: Option<String>,
    issue_time: Option<String>,
    currency: Option<String>,

    // Issuer
    issuer_nit: Option<String>,
    issuer_nrc: Option<String>,
    issuer_name: Option<String>,
    issuer_activity_code: Option<String>,
    issuer_activity_description: Option<String>,
    issuer_trade_name: Option<String>,
    issuer_establishment_type: Option<String>,
    issuer_address: ParsedAddress,
    issuer_phone: Option<String>,
    issuer_email: Option<String>,

    // Recipient
    recipient_nit: Option<String>,
    recipient_dui: Option<String>,
    recipient_name: Option<String>,
    recipient_activity_code: Option<String>,
    recipient_address: ParsedAddress,
    recipient_phone: Option<String>,
    recipient_email: Option<String>,

    // Body
    items: Vec<ParsedItem>,
    current_item: Option<ParsedItem>,

    // Summary
    total_non_subject: Option<String>,
    total_exempt: Option<String>,
    total_taxable: Option<String>,
    sales_subtotal: Option<String>,
    taxable_discount: Option<String>,
    discount_percentage: Option<String>,
    total_discount: Option<String>,
    taxes: Vec<ParsedSummaryTax>,
    current_tax: Option<ParsedSummaryTax>,
    subtotal: Option<String>,
    total_operation: Option<String>,
    total_to_pay: Option<String>,
    total_in_words: Option<String>,
    total_taxes: Option<String>,
    operation_condition: Option<String>,
    payments: Vec<ParsedPayment>,
    current_payment: Option<ParsedPayment>,

    // Extension
    delivered_by_name: Option<String>,
    delivered_by_document: Option<String>,
    received_by_name: Option<String>,
    received_by_document: Option<String>,
    observations: Option<String>,
}

impl ParsedDocument {
    fn handle_text(&mut self, path: &[String], text: String) {
        let leaf = path.last().map(|s| s.as_str()).unwrap_or("");
        let parent = if path.len() >= 2 {
            path[path.len() - 2].as_str()
        } else {
            ""
        };
        let section = path.get(1).map(|s| s.as_str()).unwrap_or("");

        match section {
            "DatosGenerales" => match leaf {
                "version" => self.version = Some(text),
                "ambiente" => self.environment = Some(text),
                "tipoDte" => self.document_type = Some(text),
                "codigoGeneracion" => self.generation_code = Some(text),
                "tipoModelo" => self.model_type = Some(text),
                "tipoOperacion" => self.operation_type = Some(text),
                "fecEmi" => self.issue_date = Some(text),
                "horEmi" => self.issue_time = Some(text),
                "tipoMoneda" => self.currency = Some(text),
                _ => {}
            },
            "DatosEmisor" if parent == "direccion" => self.issuer_address.set(leaf, text),
            "DatosEmisor" => match leaf {
                "nit" => self.issuer_nit = Some(text),
                "nrc" => self.issuer_nrc = Some(text),
                "nombre" => self.issuer_name = Some(text),
                "codActividad" => self.issuer_activity_code = Some(text),
                "descActividad" => self.issuer_activity_description = Some(text),
                "nombreComercial" => self.issuer_trade_name = Some(text),
                "tipoEstablecimiento" => self.issuer_establishment_type = Some(text),
                "telefono" => self.issuer_phone = Some(text),
                "correo" => self.issuer_email = Some(text),
                _ => {}
            },
            "DatosReceptor" if parent == "direccion" => self.recipient_address.set(leaf, text),
            "DatosReceptor" => match leaf {
                "nit" => self.recipient_nit = Some(text),
                "dui" => self.recipient_dui = Some(text),
                "nombre" => self.recipient_name = Some(text),
                "codActividad" => self.recipient_activity_code = Some(text),
                "telefono" => self.recipient_phone = Some(text),
                "correo" => self.recipient_email = Some(text),
                _ => {}
            },
            "CuerpoDocumento" => {
                let Some(item) = self.current_item.as_mut() else {
                    return;
                };
                match leaf {
                    "codigo" => item.code = Some(text),
                    "descripcion" => item.description = Some(text),
                    "cantidad" => item.quantity = Some(text),
                    "uniMedida" => item.unit = Some(text),
                    "precioUni" => item.unit_price = Some(text),
                    "montoDescu" => item.discount = Some(text),
                    "ventaNoSuj" => item.non_subject_sale = Some(text),
                    "ventaExenta" => item.exempt_sale = Some(text),
                    "ventaGravada" => item.taxable_sale = Some(text),
                    "tributo" if parent == "tributos" => item.taxes.push(text),
                    _ => {}
                }
            }
            "Resumen" if parent == "tributo" => {
                if let Some(tax) = self.current_tax.as_mut() {
                    match leaf {
                        "codigo" => tax.code = Some(text),
                        "descripcion" => tax.description = Some(text),
                        "valor" => tax.amount = Some(text),
                        _ => {}
                    }
                }
            }
            "Resumen" if parent == "pago" => {
                if let Some(payment) = self.current_payment.as_mut() {
                    match leaf {
                        "codigo" => payment.code = Some(text),
                        "montoPago" => payment.amount = Some(text),
                        "referencia" => payment.reference = Some(text),
                        "plazo" => payment.term = Some(text),
                        "periodo" => payment.period = Some(text),
                        _ => {}
                    }
                }
            }
            "Resumen" => match leaf {
                "totalNoSuj" => self.total_non_subject = Some(text),
                "totalExenta" => self.total_exempt = Some(text),
                "totalGravada" => self.total_taxable = Some(text),
                "subTotalVentas" => self.sales_subtotal = Some(text),
                "descuGravada" => self.taxable_discount = Some(text),
                "porcentajeDescuento" => self.discount_percentage = Some(text),
                "totalDescu" => self.total_discount = Some(text),
                "subTotal" => self.subtotal = Some(text),
                "montoTotalOperacion" => self.total_operation = Some(text),
                "totalPagar" => self.total_to_pay = Some(text),
                "totalLetras" => self.total_in_words = Some(text),
                "totalIva" => self.total_taxes = Some(text),
                "condicionOperacion" => self.operation_condition = Some(text),
                _ => {}
            },
            "Extension" => match leaf {
                "nombEntrega" => self.delivered_by_name = Some(text),
                "docuEntrega" => self.delivered_by_document = Some(text),
                "nombRecibe" => self.received_by_name = Some(text),
                "docuRecibe" => self.received_by_document = Some(text),
                "observaciones" => self.observations = Some(text),
                _ => {}
            },
            _ => {}
        }
    }

    fn into_document(self) -> Result<FiscalDocument, FacturaError> {
        let general = GeneralData {
            version: parse_number(self.version.as_deref(), "version")?,
            environment: self.environment.unwrap_or_default(),
            document_type: required(self.document_type, "tipoDte")?,
            generation_code: required(self.generation_code, "codigoGeneracion")?,
            model_type: parse_number(self.model_type.as_deref(), "tipoModelo")?,
            operation_type: parse_number(self.operation_type.as_deref(), "tipoOperacion")?,
            issue_date: parse_date(self.issue_date.as_deref())?,
            issue_time: parse_time(self.issue_time.as_deref())?,
            currency: self.currency.unwrap_or_default(),
        };

        let issuer = Issuer {
            nit: required(self.issuer_nit, "DatosEmisor/nit")?,
            nrc: self.issuer_nrc.unwrap_or_default(),
            name: self.issuer_name.unwrap_or_default(),
            activity_code: self.issuer_activity_code.unwrap_or_default(),
            activity_description: self.issuer_activity_description.unwrap_or_default(),
            trade_name: self.issuer_trade_name.unwrap_or_default(),
            establishment_type: self.issuer_establishment_type.unwrap_or_default(),
            address: self.issuer_address.into_address(),
            phone: self.issuer_phone,
            email: self.issuer_email.unwrap_or_default(),
        };

        let recipient = Recipient {
            nit: self.recipient_nit,
            dui: self.recipient_dui,
            name: self.recipient_name.unwrap_or_default(),
            activity_code: self.recipient_activity_code.unwrap_or_default(),
            address: self.recipient_address.into_address(),
            phone: self.recipient_phone,
            email: self.recipient_email,
        };

        let body = self
            .items
            .into_iter()
            .map(|item| {
                Ok(BodyItem {
                    number: parse_number(item.number.as_deref(), "numItem")?,
                    code: item.code.unwrap_or_default(),
                    description: item.description.unwrap_or_default(),
                    quantity: parse_decimal(item.quantity.as_deref(), "cantidad")?,
                    unit: item.unit.unwrap_or_default(),
                    unit_price: parse_decimal(item.unit_price.as_deref(), "precioUni")?,
                    discount: parse_decimal(item.discount.as_deref(), "montoDescu")?,
                    non_subject_sale: parse_decimal(item.non_subject_sale.as_deref(), "ventaNoSuj")?,
                    exempt_sale: parse_decimal(item.exempt_sale.as_deref(), "ventaExenta")?,
                    taxable_sale: parse_decimal(item.taxable_sale.as_deref(), "ventaGravada")?,
                    taxes: item.taxes,
                })
            })
            .collect::<Result<Vec<_>, FacturaError>>()?;

        let taxes = self
            .taxes
            .into_iter()
            .map(|t| {
                Ok(SummaryTax {
                    code: t.code.unwrap_or_default(),
                    description: t.description.unwrap_or_default(),
                    amount: parse_decimal(t.amount.as_deref(), "tributo/valor")?,
                })
            })
            .collect::<Result<Vec<_>, FacturaError>>()?;

        let payments = self
            .payments
            .into_iter()
            .map(|p| {
                Ok(Payment {
                    code: p.code.unwrap_or_default(),
                    amount: parse_decimal(p.amount.as_deref(), "montoPago")?,
                    reference: p.reference.unwrap_or_default(),
                    term: p
                        .term
                        .as_deref()
                        .map(|t| parse_number(Some(t), "plazo"))
                        .transpose()?,
                    period: p
                        .period
                        .as_deref()
                        .map(|t| parse_number(Some(t), "periodo"))
                        .transpose()?,
                })
            })
            .collect::<Result<Vec<_>, FacturaError>>()?;

        let summary = Summary {
            total_non_subject: parse_decimal(self.total_non_subject.as_deref(), "totalNoSuj")?,
            total_exempt: parse_decimal(self.total_exempt.as_deref(), "totalExenta")?,
            total_taxable: parse_decimal(self.total_taxable.as_deref(), "totalGravada")?,
            sales_subtotal: parse_decimal(self.sales_subtotal.as_deref(), "subTotalVentas")?,
            taxable_discount: parse_decimal(self.taxable_discount.as_deref(), "descuGravada")?,
            discount_percentage: parse_decimal(
                self.discount_percentage.as_deref(),
                "porcentajeDescuento",
            )?,
            total_discount: parse_decimal(self.total_discount.as_deref(), "totalDescu")?,
            taxes,
            subtotal: parse_decimal(self.subtotal.as_deref(), "subTotal")?,
            total_operation: parse_decimal(self.total_operation.as_deref(), "montoTotalOperacion")?,
            total_to_pay: parse_decimal(self.total_to_pay.as_deref(), "totalPagar")?,
            total_in_words: self.total_in_words.unwrap_or_default(),
            total_taxes: parse_decimal(self.total_taxes.as_deref(), "totalIva")?,
            operation_condition: parse_number(
                self.operation_condition.as_deref(),
                "condicionOperacion",
            )?,
            payments,
        };

        let extension = Extension {
            delivered_by_name: self.delivered_by_name.unwrap_or_default(),
            delivered_by_document: self.delivered_by_document.unwrap_or_default(),
            received_by_name: self.received_by_name.unwrap_or_default(),
            received_by_document: self.received_by_document.unwrap_or_default(),
            observations: self.observations,
        };

        Ok(FiscalDocument {
            general,
            issuer,
            recipient,
            body,
            summary,
            extension,
        })
    }
}

fn required(value: Option<String>, field: &str) -> Result<String, FacturaError> {
    value.ok_or_else(|| FacturaError::Xml(format!("missing {field}")))
}

fn parse_decimal(s: Option<&str>, field: &str) -> Result<Decimal, FacturaError> {
    let s = s.ok_or_else(|| FacturaError::Xml(format!("missing {field}")))?;
    Decimal::from_str(s).map_err(|e| FacturaError::Xml(format!("invalid decimal '{s}' in {field}: {e}")))
}

fn parse_number<T: FromStr>(s: Option<&str>, field: &str) -> Result<T, FacturaError>
where
    T::Err: std::fmt::Display,
{
    let s = s.ok_or_else(|| FacturaError::Xml(format!("missing {field}")))?;
    s.parse()
        .map_err(|e| FacturaError::Xml(format!("invalid number '{s}' in {field}: {e}")))
}

fn parse_date(s: Option<&str>) -> Result<NaiveDate, FacturaError> {
    let s = s.ok_or_else(|| FacturaError::Xml("missing fecEmi".into()))?;
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .map_err(|e| FacturaError::Xml(format!("invalid date '{s}': {e}")))
}

fn parse_time(s: Option<&str>) -> Result<NaiveTime, FacturaError> {
    let s = s.ok_or_else(|| FacturaError::Xml("missing horEmi".into()))?;
    NaiveTime::parse_from_str(s, TIME_FORMAT)
        .map_err(|e| FacturaError::Xml(format!("invalid time '{s}': {e}")))
}
